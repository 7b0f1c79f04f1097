//! # 设备使用台账
//!
//! ## 业务作用
//! 记录通道校准过程中每种类型的测试设备使用了哪一台，保证校准结果可追溯到具体设备
//! 及其当时的校准到期日。
//!
//! ## 规则
//! - 记录只追加，不修改、不删除（通道整体删除除外）
//! - 某类型的当前设备 = 该类型时间戳最新记录对应的设备；时间戳相同时后写入者优先
//! - 再次指定与当前设备相同的设备不产生新记录

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::models::structs::{default_id, ChannelEquipmentRecord, TestEquipment};

/// 指定设备的结果
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentOutcome {
    /// 追加了新记录
    Appended(ChannelEquipmentRecord),
    /// 当前设备已是该设备，返回现有记录
    Unchanged(ChannelEquipmentRecord),
}

impl AssignmentOutcome {
    pub fn record(&self) -> &ChannelEquipmentRecord {
        match self {
            AssignmentOutcome::Appended(r) | AssignmentOutcome::Unchanged(r) => r,
        }
    }

    pub fn is_appended(&self) -> bool {
        matches!(self, AssignmentOutcome::Appended(_))
    }
}

/// 单个通道的设备使用台账
#[derive(Debug, Clone, Default)]
pub struct EquipmentAssignmentLedger {
    channel_id: String,
    records: Vec<ChannelEquipmentRecord>,
}

impl EquipmentAssignmentLedger {
    /// `records` 按写入顺序排列
    pub fn new(channel_id: impl Into<String>, records: Vec<ChannelEquipmentRecord>) -> Self {
        Self {
            channel_id: channel_id.into(),
            records,
        }
    }

    pub fn records(&self) -> &[ChannelEquipmentRecord] {
        &self.records
    }

    /// 某类型当前生效的记录
    pub fn current_record(&self, equipment_type_id: &str) -> Option<&ChannelEquipmentRecord> {
        // max_by 在相等时返回最后一个元素
        self.records
            .iter()
            .filter(|r| r.test_equipment_type_id == equipment_type_id)
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
    }

    /// 某类型当前使用的设备ID
    pub fn current(&self, equipment_type_id: &str) -> Option<&str> {
        self.current_record(equipment_type_id)
            .map(|r| r.test_equipment_id.as_str())
    }

    /// 某类型的全部使用记录，按时间先后排列
    pub fn history(&self, equipment_type_id: &str) -> Vec<&ChannelEquipmentRecord> {
        let mut history: Vec<_> = self
            .records
            .iter()
            .filter(|r| r.test_equipment_type_id == equipment_type_id)
            .collect();
        history.sort_by_key(|r| r.timestamp);
        history
    }

    /// 指定某类型使用的设备
    ///
    /// 新记录快照设备当时的校准到期日
    pub fn assign(
        &mut self,
        equipment: &TestEquipment,
        equipment_type_id: &str,
        now: DateTime<Utc>,
    ) -> AssignmentOutcome {
        let latest = self.current_record(equipment_type_id).cloned();
        if let Some(current) = &latest {
            if current.test_equipment_id == equipment.id {
                log::debug!(
                    "[EQUIPMENT_LEDGER] 通道 {} 类型 {} 已使用设备 {}，不重复记录",
                    self.channel_id,
                    equipment_type_id,
                    equipment.name
                );
                return AssignmentOutcome::Unchanged(current.clone());
            }
        }

        // 新记录的时间戳必须严格晚于当前记录，时钟回拨时也不例外
        let timestamp = match &latest {
            Some(current) if current.timestamp >= now => current.timestamp + Duration::microseconds(1),
            _ => now,
        };

        let record = ChannelEquipmentRecord {
            id: default_id(),
            channel_id: self.channel_id.clone(),
            test_equipment_type_id: equipment_type_id.to_string(),
            test_equipment_id: equipment.id.clone(),
            timestamp,
            calibration_due_date: equipment.due_date(),
        };
        self.records.push(record.clone());

        log::info!(
            "[EQUIPMENT_LEDGER] 通道 {} 类型 {} 改用设备 {}",
            self.channel_id,
            equipment_type_id,
            equipment.name
        );
        AssignmentOutcome::Appended(record)
    }

    /// 必需但尚未指定设备的类型，按ID排序
    pub fn missing_types(&self, required: &HashSet<String>) -> Vec<String> {
        let mut missing: Vec<String> = required
            .iter()
            .filter(|type_id| self.current_record(type_id).is_none())
            .cloned()
            .collect();
        missing.sort();
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::structs::CalibrationRecord;
    use chrono::TimeZone;

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn equipment_with_due_date(name: &str, due: DateTime<Utc>) -> TestEquipment {
        let mut equipment = TestEquipment::new(name);
        let record = CalibrationRecord::new(&equipment.id, due - Duration::days(365), due);
        equipment.add_calibration_record(record);
        equipment
    }

    #[test]
    fn test_no_record_means_no_current_equipment() {
        let ledger = EquipmentAssignmentLedger::new("ch", Vec::new());
        assert_eq!(ledger.current("multimeter"), None);
    }

    fn record(equipment_id: &str, at: DateTime<Utc>) -> ChannelEquipmentRecord {
        ChannelEquipmentRecord {
            id: default_id(),
            channel_id: "ch".to_string(),
            test_equipment_type_id: "calibrator".to_string(),
            test_equipment_id: equipment_id.to_string(),
            timestamp: at,
            calibration_due_date: None,
        }
    }

    /// 记录按写入顺序而非时间顺序加载时，仍以时间最新者为当前
    #[test]
    fn test_current_is_latest_timestamp_not_last_loaded() {
        let ledger = EquipmentAssignmentLedger::new(
            "ch",
            vec![record("e2", t(20)), record("e3", t(30)), record("e1", t(10))],
        );

        assert_eq!(ledger.current("calibrator"), Some("e3"));
        let history: Vec<_> = ledger
            .history("calibrator")
            .into_iter()
            .map(|r| r.test_equipment_id.as_str())
            .collect();
        assert_eq!(history, vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn test_latest_assignment_is_current() {
        let e1 = TestEquipment::new("Fluke 87V #1");
        let e2 = TestEquipment::new("Fluke 87V #2");
        let mut ledger = EquipmentAssignmentLedger::new("ch", Vec::new());

        assert!(ledger.assign(&e1, "multimeter", t(0)).is_appended());
        assert!(ledger.assign(&e2, "multimeter", t(10)).is_appended());

        assert_eq!(ledger.current("multimeter"), Some(e2.id.as_str()));
        assert_eq!(ledger.history("multimeter").len(), 2);
    }

    /// 重复指定当前设备不追加记录
    #[test]
    fn test_assigning_current_equipment_is_noop() {
        let e1 = TestEquipment::new("Fluke 754");
        let mut ledger = EquipmentAssignmentLedger::new("ch", Vec::new());

        let first = ledger.assign(&e1, "calibrator", t(0));
        let second = ledger.assign(&e1, "calibrator", t(5));

        assert!(!second.is_appended());
        assert_eq!(first.record(), second.record());
        assert_eq!(ledger.records().len(), 1);
    }

    /// 切换回旧设备会追加新记录，历史保持不变
    #[test]
    fn test_switching_back_appends_and_keeps_history() {
        let e1 = TestEquipment::new("A");
        let e2 = TestEquipment::new("B");
        let mut ledger = EquipmentAssignmentLedger::new("ch", Vec::new());

        ledger.assign(&e1, "calibrator", t(0));
        ledger.assign(&e2, "calibrator", t(1));
        ledger.assign(&e1, "calibrator", t(2));

        let history: Vec<_> = ledger
            .history("calibrator")
            .iter()
            .map(|r| r.test_equipment_id.clone())
            .collect();
        assert_eq!(history, vec![e1.id.clone(), e2.id.clone(), e1.id.clone()]);
        assert_eq!(ledger.current("calibrator"), Some(e1.id.as_str()));
    }

    /// 外部载入的同时间戳记录，后写入者为当前设备
    #[test]
    fn test_timestamp_tie_prefers_last_inserted() {
        let record = |equipment: &str| ChannelEquipmentRecord {
            id: default_id(),
            channel_id: "ch".to_string(),
            test_equipment_type_id: "calibrator".to_string(),
            test_equipment_id: equipment.to_string(),
            timestamp: t(0),
            calibration_due_date: None,
        };
        let ledger = EquipmentAssignmentLedger::new("ch", vec![record("A"), record("B")]);
        assert_eq!(ledger.current("calibrator"), Some("B"));
    }

    #[test]
    fn test_clock_skew_still_makes_new_assignment_current() {
        let e1 = TestEquipment::new("A");
        let e2 = TestEquipment::new("B");
        let mut ledger = EquipmentAssignmentLedger::new("ch", Vec::new());

        ledger.assign(&e1, "calibrator", t(0));
        let outcome = ledger.assign(&e2, "calibrator", t(-5));
        assert!(outcome.record().timestamp > t(0));
        assert_eq!(ledger.current("calibrator"), Some(e2.id.as_str()));
    }

    #[test]
    fn test_due_date_is_snapshotted() {
        let mut equipment = equipment_with_due_date("Fluke 754", t(1000));
        let mut ledger = EquipmentAssignmentLedger::new("ch", Vec::new());
        ledger.assign(&equipment, "calibrator", t(0));

        // 设备后续重新校准不影响已写入的记录
        let recal = CalibrationRecord::new(&equipment.id, t(2000), t(5000));
        equipment.add_calibration_record(recal);

        let record = ledger.current_record("calibrator").unwrap();
        assert_eq!(record.calibration_due_date, Some(t(1000)));
        assert_eq!(equipment.due_date(), Some(t(5000)));
    }

    #[test]
    fn test_types_are_independent_and_missing_types_reported() {
        let meter = TestEquipment::new("Meter");
        let mut ledger = EquipmentAssignmentLedger::new("ch", Vec::new());
        ledger.assign(&meter, "multimeter", t(0));

        let required: HashSet<String> = ["multimeter", "calibrator", "decade_box"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(ledger.current("calibrator"), None);
        assert_eq!(
            ledger.missing_types(&required),
            vec!["calibrator".to_string(), "decade_box".to_string()]
        );
    }
}
