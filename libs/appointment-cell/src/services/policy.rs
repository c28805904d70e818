use shared_database::ClinicStore;
use shared_models::auth::{Actor, Role};
use shared_models::records::{Appointment, AppointmentStatus};

/// How the actor relates to a specific appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    /// The actor's patient profile booked it.
    Owner,
    /// The actor's doctor profile is assigned to it.
    Assigned,
    Unrelated,
}

struct PolicyRule {
    role: Role,
    /// None means the rule applies regardless of relationship.
    relationship: Option<Relationship>,
    transitions: &'static [AppointmentStatus],
}

/// Who may move an appointment where. Consulted before every mutation and
/// privileged read; an actor matching no rule gets nothing.
const POLICY: &[PolicyRule] = &[
    PolicyRule {
        role: Role::Admin,
        relationship: None,
        transitions: &[
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
            AppointmentStatus::Reprogrammed,
        ],
    },
    PolicyRule {
        role: Role::Patient,
        relationship: Some(Relationship::Owner),
        transitions: &[AppointmentStatus::Cancelled, AppointmentStatus::Reprogrammed],
    },
    PolicyRule {
        role: Role::Doctor,
        relationship: Some(Relationship::Assigned),
        transitions: &[
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
            AppointmentStatus::Reprogrammed,
        ],
    },
];

fn matching_rule(role: Role, relationship: Relationship) -> Option<&'static PolicyRule> {
    POLICY
        .iter()
        .find(|rule| rule.role == role && rule.relationship.map_or(true, |r| r == relationship))
}

/// May the actor move the appointment into `target`?
pub fn can_transition(role: Role, relationship: Relationship, target: AppointmentStatus) -> bool {
    matching_rule(role, relationship)
        .map(|rule| rule.transitions.contains(&target))
        .unwrap_or(false)
}

/// May the actor read the appointment at all?
pub fn can_read(role: Role, relationship: Relationship) -> bool {
    matching_rule(role, relationship).is_some()
}

/// Resolve the actor's relationship to an appointment via their profile.
pub async fn relationship(store: &ClinicStore, actor: Actor, appointment: &Appointment) -> Relationship {
    match actor.role {
        Role::Patient => {
            if let Some(patient) = store.find_patient_by_user(actor.id).await {
                if patient.id == appointment.patient_id {
                    return Relationship::Owner;
                }
            }
            Relationship::Unrelated
        }
        Role::Doctor => {
            if let Some(doctor) = store.find_doctor_by_user(actor.id).await {
                if doctor.id == appointment.doctor_id {
                    return Relationship::Assigned;
                }
            }
            Relationship::Unrelated
        }
        Role::Admin => Relationship::Unrelated,
    }
}
