use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{Display, EnumIter, EnumString};
use validator::{Validate, ValidationError};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StaffRole {
    Manager,
    Supervisor,
    #[default]
    Housekeeper,
    Maintenance,
}

/// `Busy` is derived from open assignments and never set directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StaffStatus {
    Available,
    Busy,
    Break,
    OffDuty,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Shift {
    #[default]
    Morning,
    Evening,
    Night,
    FullDay,
}

/// Point-in-time copy of a staff member's identity. Stored on rooms and
/// assignments so later renames do not rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: StaffRole,
    pub status: StaffStatus,
    pub shift: Shift,
    pub pin: String,
    pub hire_date: NaiveDate,
    pub efficiency: u8,
    /// Rooms with an open assignment for this staff member.
    #[serde(default)]
    pub rooms_assigned: BTreeSet<String>,
    #[serde(default)]
    pub specializations: BTreeSet<String>,
    #[serde(default)]
    pub notes: String,
}

impl Staff {
    pub fn to_ref(&self) -> StaffRef {
        StaffRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    pub fn has_open_work(&self) -> bool {
        !self.rooms_assigned.is_empty()
    }

    /// Re-derives `Busy` from `rooms_assigned`. A member who drops to no open
    /// work goes back to `Available`; break and off-duty are left alone.
    pub fn recompute_status(&mut self) {
        if self.has_open_work() {
            self.status = StaffStatus::Busy;
        } else if self.status == StaffStatus::Busy {
            self.status = StaffStatus::Available;
        }
    }

    pub fn verify_pin(&self, pin: &str) -> bool {
        self.pin == pin
    }

    pub fn has_specialization(&self, name: &str) -> bool {
        self.specializations
            .iter()
            .any(|s| s.eq_ignore_ascii_case(name))
    }
}

/// Profile submitted by the add-staff flow.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewStaff {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: StaffRole,
    #[serde(default)]
    pub shift: Shift,
    /// Generated when absent.
    #[validate(custom = "validate_pin")]
    pub pin: Option<String>,
    /// Defaults to 80 when absent.
    #[validate(range(max = 100))]
    pub efficiency: Option<u8>,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// Edit-flow patch; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StaffPatch {
    #[validate(length(min = 1, message = "name cannot be blank"))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<StaffRole>,
    pub shift: Option<Shift>,
    pub status: Option<StaffStatus>,
    #[validate(custom = "validate_pin")]
    pub pin: Option<String>,
    #[validate(range(max = 100))]
    pub efficiency: Option<u8>,
    pub specializations: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl StaffPatch {
    pub fn apply_to(self, staff: &mut Staff) {
        if let Some(name) = self.name {
            staff.name = name;
        }
        if let Some(email) = self.email {
            staff.email = email;
        }
        if let Some(phone) = self.phone {
            staff.phone = phone;
        }
        if let Some(role) = self.role {
            staff.role = role;
        }
        if let Some(shift) = self.shift {
            staff.shift = shift;
        }
        if let Some(status) = self.status {
            staff.status = status;
        }
        if let Some(pin) = self.pin {
            staff.pin = pin;
        }
        if let Some(efficiency) = self.efficiency {
            staff.efficiency = efficiency;
        }
        if let Some(specializations) = self.specializations {
            staff.specializations = specializations.into_iter().collect();
        }
        if let Some(notes) = self.notes {
            staff.notes = notes;
        }
    }
}

/// PINs are exactly four ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if pin.len() == 4 && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("pin");
        err.message = Some("PIN must be exactly 4 digits".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffFilter {
    pub role: Option<StaffRole>,
    pub status: Option<StaffStatus>,
    /// Matches name or email, case-insensitively.
    pub search: Option<String>,
}

impl StaffFilter {
    pub fn matches(&self, staff: &Staff) -> bool {
        if self.role.is_some_and(|role| staff.role != role) {
            return false;
        }
        if self.status.is_some_and(|status| staff.status != status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                staff.name.to_lowercase().contains(&term)
                    || staff.email.to_lowercase().contains(&term)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRecord {
    pub staff_id: String,
    pub name: String,
    pub role: StaffRole,
    pub shift: Shift,
    pub login_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Staff {
        Staff {
            id: "1".into(),
            name: "Maria Santos".into(),
            email: "maria@hotel.com".into(),
            phone: "+1-555-0101".into(),
            role: StaffRole::Housekeeper,
            status: StaffStatus::Available,
            shift: Shift::Morning,
            pin: "1234".into(),
            hire_date: NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
            efficiency: 95,
            rooms_assigned: BTreeSet::new(),
            specializations: ["Deep Cleaning".to_string()].into_iter().collect(),
            notes: String::new(),
        }
    }

    #[test]
    fn busy_follows_open_rooms() {
        let mut staff = sample();
        staff.rooms_assigned.insert("101".into());
        staff.recompute_status();
        assert_eq!(staff.status, StaffStatus::Busy);

        staff.rooms_assigned.clear();
        staff.recompute_status();
        assert_eq!(staff.status, StaffStatus::Available);

        staff.status = StaffStatus::Break;
        staff.recompute_status();
        assert_eq!(staff.status, StaffStatus::Break);
    }

    #[test]
    fn pin_must_be_four_digits() {
        assert!(validate_pin("0420").is_ok());
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("12a4").is_err());
        assert!(validate_pin("12345").is_err());
    }

    #[test]
    fn new_staff_validation_checks_email_and_pin() {
        let profile = NewStaff {
            name: "Ana".into(),
            email: "not-an-email".into(),
            pin: Some("12".into()),
            ..Default::default()
        };
        let errors = profile.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("pin"));
    }

    #[test]
    fn filter_matches_email_and_role() {
        let staff = sample();
        let filter = StaffFilter {
            role: Some(StaffRole::Housekeeper),
            search: Some("HOTEL.COM".into()),
            ..Default::default()
        };
        assert!(filter.matches(&staff));
        let filter = StaffFilter {
            role: Some(StaffRole::Manager),
            ..Default::default()
        };
        assert!(!filter.matches(&staff));
    }

    #[test]
    fn status_and_shift_wire_names() {
        assert_eq!(
            serde_json::to_string(&StaffStatus::OffDuty).unwrap(),
            "\"off-duty\""
        );
        assert_eq!(Shift::FullDay.to_string(), "full-day");
    }
}
