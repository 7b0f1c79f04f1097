// 详细注释：声明 entities 模块下的所有实体

pub mod project;
pub mod job;
pub mod group;
pub mod channel;
pub mod test_point;
pub mod company;
pub mod user;
pub mod test_equipment_type;
pub mod test_equipment;
pub mod calibration_record;
pub mod channel_equipment_record;
pub mod approval_record;
pub mod association;
