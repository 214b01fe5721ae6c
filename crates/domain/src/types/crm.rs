//! Typed CRM mutations
//!
//! The queue itself stays open-ended (a type tag plus a JSON payload); these
//! are the action kinds the CRM front end issues today. Each variant's wire
//! name is the `type` tag stored on the resulting [`PendingAction`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::action::PendingAction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    pub contact_id: String,
    /// Partial field set; absent keys are left untouched remotely
    pub changes: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeal {
    pub title: String,
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealStageChange {
    pub deal_id: String,
    pub stage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// Start time in epoch milliseconds
    pub starts_at: i64,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub subject_id: String,
    pub kind: String,
    pub note: String,
}

/// Known CRM mutation kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum CrmAction {
    CreateContact(NewContact),
    UpdateContact(ContactUpdate),
    CreateDeal(NewDeal),
    UpdateDealStage(DealStageChange),
    ScheduleAppointment(AppointmentRequest),
    SendEmail(OutboundEmail),
    LogActivity(ActivityLog),
}

impl CrmAction {
    /// Type tag stored on the queued action
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::CreateContact(_) => "createContact",
            Self::UpdateContact(_) => "updateContact",
            Self::CreateDeal(_) => "createDeal",
            Self::UpdateDealStage(_) => "updateDealStage",
            Self::ScheduleAppointment(_) => "scheduleAppointment",
            Self::SendEmail(_) => "sendEmail",
            Self::LogActivity(_) => "logActivity",
        }
    }

    /// Consume the action and return its JSON payload
    ///
    /// # Errors
    /// Propagates serde failures (only possible for non-string map keys
    /// inside `ContactUpdate::changes`).
    pub fn into_payload(self) -> serde_json::Result<Value> {
        match self {
            Self::CreateContact(p) => serde_json::to_value(p),
            Self::UpdateContact(p) => serde_json::to_value(p),
            Self::CreateDeal(p) => serde_json::to_value(p),
            Self::UpdateDealStage(p) => serde_json::to_value(p),
            Self::ScheduleAppointment(p) => serde_json::to_value(p),
            Self::SendEmail(p) => serde_json::to_value(p),
            Self::LogActivity(p) => serde_json::to_value(p),
        }
    }

    /// Rebuild the typed action from a queued record
    ///
    /// # Errors
    /// Fails when the type tag is unknown or the payload does not match it.
    pub fn from_pending(action: &PendingAction) -> serde_json::Result<Self> {
        let tagged = serde_json::json!({
            "type": action.action_type,
            "payload": action.payload,
        });
        serde_json::from_value(tagged)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn action_type_matches_serde_tag() {
        let action = CrmAction::UpdateDealStage(DealStageChange {
            deal_id: "deal-9".into(),
            stage: "negotiation".into(),
        });

        let tagged = serde_json::to_value(&action).unwrap();
        assert_eq!(tagged["type"], action.action_type());
        assert_eq!(tagged["payload"]["dealId"], "deal-9");
    }

    #[test]
    fn into_payload_strips_the_tag() {
        let action = CrmAction::CreateContact(NewContact {
            name: "Jane".into(),
            email: None,
            phone: None,
            organization_id: None,
        });

        assert_eq!(action.into_payload().unwrap(), json!({"name": "Jane"}));
    }

    #[test]
    fn from_pending_rebuilds_typed_action() {
        let pending = PendingAction::new(
            "scheduleAppointment",
            json!({"patientId": "p-1", "startsAt": 1_700_000_000_000_i64, "durationMinutes": 30}),
            0,
        );

        match CrmAction::from_pending(&pending).unwrap() {
            CrmAction::ScheduleAppointment(appt) => {
                assert_eq!(appt.patient_id, "p-1");
                assert_eq!(appt.duration_minutes, 30);
                assert!(appt.provider_id.is_none());
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn from_pending_rejects_unknown_type() {
        let pending = PendingAction::new("archivePatient", json!({}), 0);
        assert!(CrmAction::from_pending(&pending).is_err());
    }
}
