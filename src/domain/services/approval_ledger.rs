//! # 审批台账
//!
//! ## 业务作用
//! 管理通道的多方审批：供应商审批始终需要，客户审批只在 ATP 期次的作业中需要。
//! 每个用户对每个通道最多保留一条审批记录，记录中保存审批时用户所属公司的类别。
//!
//! 审批要求只在通道创建时按作业期次计算一次，作业期次之后被修改不会自动重算。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::enums::{CompanyCategory, JobPhase};
use crate::models::structs::{default_id, ApprovalRecord, Channel};

/// 按作业期次设置通道的审批要求
pub fn update_required_approvals(channel: &mut Channel, phase: JobPhase) {
    channel.required_supplier_approval = true;
    channel.required_client_approval = phase == JobPhase::Atp;
}

/// 单个通道的审批台账
#[derive(Debug, Clone, Default)]
pub struct ApprovalLedger {
    channel_id: String,
    records: Vec<ApprovalRecord>,
}

impl ApprovalLedger {
    pub fn new(channel_id: impl Into<String>, records: Vec<ApprovalRecord>) -> Self {
        Self {
            channel_id: channel_id.into(),
            records,
        }
    }

    pub fn records(&self) -> &[ApprovalRecord] {
        &self.records
    }

    pub fn has(&self, user_id: &str) -> bool {
        self.records.iter().any(|r| r.user_id == user_id)
    }

    /// 添加审批，用户已审批时返回 None
    pub fn add(
        &mut self,
        user_id: &str,
        company_category: CompanyCategory,
        now: DateTime<Utc>,
    ) -> Option<ApprovalRecord> {
        if self.has(user_id) {
            return None;
        }

        let record = ApprovalRecord {
            id: default_id(),
            channel_id: self.channel_id.clone(),
            user_id: user_id.to_string(),
            company_category,
            timestamp: now,
        };
        self.records.push(record.clone());
        Some(record)
    }

    /// 撤销审批，用户未审批时返回 None
    pub fn remove(&mut self, user_id: &str) -> Option<ApprovalRecord> {
        let index = self.records.iter().position(|r| r.user_id == user_id)?;
        Some(self.records.remove(index))
    }

    /// 某类别的审批记录，多条时取最早的一条
    pub fn approval_of_category(&self, category: CompanyCategory) -> Option<&ApprovalRecord> {
        self.records
            .iter()
            .filter(|r| r.company_category == category)
            .min_by(|a, b| a.timestamp.cmp(&b.timestamp))
    }

    pub fn supplier_approval_record(&self) -> Option<&ApprovalRecord> {
        self.approval_of_category(CompanyCategory::Supplier)
    }

    pub fn client_approval_record(&self) -> Option<&ApprovalRecord> {
        self.approval_of_category(CompanyCategory::Client)
    }

    /// 结合通道的审批要求汇总当前审批情况
    pub fn gate(&self, channel: &Channel) -> ApprovalGate {
        ApprovalGate {
            channel_id: channel.id.clone(),
            supplier_required: channel.required_supplier_approval,
            client_required: channel.required_client_approval,
            supplier_approval: self.supplier_approval_record().cloned(),
            client_approval: self.client_approval_record().cloned(),
        }
    }
}

/// 通道审批情况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalGate {
    pub channel_id: String,
    pub supplier_required: bool,
    pub client_required: bool,
    pub supplier_approval: Option<ApprovalRecord>,
    pub client_approval: Option<ApprovalRecord>,
}

impl ApprovalGate {
    /// 所有必需的审批均已给出
    pub fn is_satisfied(&self) -> bool {
        (!self.supplier_required || self.supplier_approval.is_some())
            && (!self.client_required || self.client_approval.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_required_approvals_follow_job_phase() {
        let mut channel = Channel::new("group", "PT-1");

        update_required_approvals(&mut channel, JobPhase::Commissioning);
        assert!(channel.required_supplier_approval);
        assert!(!channel.required_client_approval);

        update_required_approvals(&mut channel, JobPhase::Atp);
        assert!(channel.required_supplier_approval);
        assert!(channel.required_client_approval);
    }

    /// 同一用户重复审批或重复撤销均为幂等
    #[test]
    fn test_add_and_remove_are_idempotent() {
        let mut ledger = ApprovalLedger::new("ch", Vec::new());
        let now = Utc::now();

        assert!(ledger.add("u1", CompanyCategory::Supplier, now).is_some());
        assert!(ledger.add("u1", CompanyCategory::Supplier, now).is_none());
        assert_eq!(ledger.records().len(), 1);
        assert!(ledger.has("u1"));

        assert!(ledger.remove("u1").is_some());
        assert!(ledger.remove("u1").is_none());
        assert!(!ledger.has("u1"));
    }

    #[test]
    fn test_category_lookup() {
        let mut ledger = ApprovalLedger::new("ch", Vec::new());
        let now = Utc::now();
        ledger.add("supplier-late", CompanyCategory::Supplier, now + Duration::seconds(5));
        ledger.add("supplier-early", CompanyCategory::Supplier, now);

        assert_eq!(ledger.supplier_approval_record().unwrap().user_id, "supplier-early");
        assert!(ledger.client_approval_record().is_none());

        ledger.add("client", CompanyCategory::Client, now);
        assert_eq!(ledger.client_approval_record().unwrap().user_id, "client");
    }

    #[test]
    fn test_gate_satisfaction() {
        let mut channel = Channel::new("group", "PT-1");
        update_required_approvals(&mut channel, JobPhase::Atp);
        let mut ledger = ApprovalLedger::new(&channel.id, Vec::new());

        assert!(!ledger.gate(&channel).is_satisfied());

        ledger.add("s", CompanyCategory::Supplier, Utc::now());
        assert!(!ledger.gate(&channel).is_satisfied());

        ledger.add("c", CompanyCategory::Client, Utc::now());
        let gate = ledger.gate(&channel);
        assert!(gate.is_satisfied());
        assert_eq!(gate.channel_id, channel.id);
    }
}
