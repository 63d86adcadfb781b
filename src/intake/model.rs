//! Intake form data model.

use serde::{Deserialize, Serialize};

use super::stage::Stage;

/// Whether the loved one knows the family is looking at communities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwareLooking {
    Yes,
    No,
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl AwareLooking {
    /// Classify a free-text answer: any case-insensitive "yes" counts as
    /// affirmative, everything else (including an empty answer) as no.
    pub fn from_answer(answer: &str) -> Self {
        if answer.to_lowercase().contains("yes") {
            Self::Yes
        } else {
            Self::No
        }
    }

    /// Parse a form value; unknown text leaves the field unset.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "yes" => Self::Yes,
            "no" => Self::No,
            _ => Self::Unset,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Unset => "",
        }
    }
}

/// How the family prefers to be followed up with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    Phone,
    Email,
    Mail,
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl ContactMethod {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "phone" => Self::Phone,
            "email" => Self::Email,
            "mail" => Self::Mail,
            _ => Self::Unset,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Mail => "mail",
            Self::Unset => "",
        }
    }
}

/// Every field of the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeField {
    Name,
    Location,
    FamilyMemberName,
    ReasonForCall,
    GreatestConcern,
    Impact,
    CurrentResidence,
    DailyRoutine,
    EnjoysDoing,
    AwareLooking,
    FeelingsAboutMove,
    OthersInvolved,
    MostImportant,
    ConfidenceFactors,
    Recap,
    Email,
    MailingAddress,
    PreferredContactMethod,
    ReferralSource,
}

impl IntakeField {
    pub const ALL: [IntakeField; 19] = [
        IntakeField::Name,
        IntakeField::Location,
        IntakeField::FamilyMemberName,
        IntakeField::ReasonForCall,
        IntakeField::GreatestConcern,
        IntakeField::Impact,
        IntakeField::CurrentResidence,
        IntakeField::DailyRoutine,
        IntakeField::EnjoysDoing,
        IntakeField::AwareLooking,
        IntakeField::FeelingsAboutMove,
        IntakeField::OthersInvolved,
        IntakeField::MostImportant,
        IntakeField::ConfidenceFactors,
        IntakeField::Recap,
        IntakeField::Email,
        IntakeField::MailingAddress,
        IntakeField::PreferredContactMethod,
        IntakeField::ReferralSource,
    ];

    /// Fields filled from the four discovery categories, plus the recap. The
    /// recap can also be defined by the loved one's name alone.
    pub const DISCOVERY: [IntakeField; 12] = [
        IntakeField::ReasonForCall,
        IntakeField::GreatestConcern,
        IntakeField::Impact,
        IntakeField::CurrentResidence,
        IntakeField::DailyRoutine,
        IntakeField::EnjoysDoing,
        IntakeField::AwareLooking,
        IntakeField::FeelingsAboutMove,
        IntakeField::OthersInvolved,
        IntakeField::MostImportant,
        IntakeField::ConfidenceFactors,
        IntakeField::Recap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Location => "location",
            Self::FamilyMemberName => "family_member_name",
            Self::ReasonForCall => "reason_for_call",
            Self::GreatestConcern => "greatest_concern",
            Self::Impact => "impact",
            Self::CurrentResidence => "current_residence",
            Self::DailyRoutine => "daily_routine",
            Self::EnjoysDoing => "enjoys_doing",
            Self::AwareLooking => "aware_looking",
            Self::FeelingsAboutMove => "feelings_about_move",
            Self::OthersInvolved => "others_involved",
            Self::MostImportant => "most_important",
            Self::ConfidenceFactors => "confidence_factors",
            Self::Recap => "recap",
            Self::Email => "email",
            Self::MailingAddress => "mailing_address",
            Self::PreferredContactMethod => "preferred_contact_method",
            Self::ReferralSource => "referral_source",
        }
    }

    pub fn parse(raw: &str) -> Option<IntakeField> {
        let key = raw.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|f| f.as_str() == key)
    }

    /// The prompt shown next to the field in the form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Location => "Location",
            Self::FamilyMemberName => "Family member's name",
            Self::ReasonForCall => "What made you decide to call us today?",
            Self::GreatestConcern => "What's your greatest concern at this time?",
            Self::Impact => "How is this impacting you?",
            Self::CurrentResidence => "Where does your family member currently live?",
            Self::DailyRoutine => "Tell me about your family member's daily routine",
            Self::EnjoysDoing => "What does he/she enjoy doing?",
            Self::AwareLooking => "Is he/she aware that you're looking?",
            Self::FeelingsAboutMove => "How does he/she feel about the move?",
            Self::OthersInvolved => {
                "Is anyone else going to be involved in supporting you to make this decision?"
            }
            Self::MostImportant => {
                "What's most important to you regarding the community you may choose?"
            }
            Self::ConfidenceFactors => {
                "What would make you feel confident that this is the right decision for your family?"
            }
            Self::Recap => "Recap (It sounds like...)",
            Self::Email => "Email",
            Self::MailingAddress => "Mailing address",
            Self::PreferredContactMethod => "Preferred contact method",
            Self::ReferralSource => "How did you hear about us?",
        }
    }

    /// The form step this field is shown under. Email is collected with the
    /// visit details but has no step of its own.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Name | Self::Location | Self::FamilyMemberName => Some(Stage::TrustBuilding),
            Self::ReasonForCall | Self::GreatestConcern | Self::Impact | Self::CurrentResidence => {
                Some(Stage::SituationDiscovery)
            }
            Self::DailyRoutine | Self::EnjoysDoing => Some(Stage::LifestyleDiscovery),
            Self::AwareLooking | Self::FeelingsAboutMove | Self::OthersInvolved => {
                Some(Stage::ReadinessDiscovery)
            }
            Self::MostImportant | Self::ConfidenceFactors => Some(Stage::PrioritiesDiscovery),
            Self::Recap => Some(Stage::NeedsMatching),
            Self::MailingAddress | Self::PreferredContactMethod | Self::ReferralSource => {
                Some(Stage::VisitTransition)
            }
            Self::Email => None,
        }
    }

    /// Fields grouped under `stage` in the stepper form, in display order.
    pub fn for_stage(stage: Stage) -> Vec<IntakeField> {
        Self::ALL
            .into_iter()
            .filter(|f| f.stage() == Some(stage))
            .collect()
    }
}

impl std::fmt::Display for IntakeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partial intake form produced by one extraction pass. `None` means
/// "no data in this snapshot", never "clear the field".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_member_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_for_call: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greatest_concern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_residence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_routine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enjoys_doing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aware_looking: Option<AwareLooking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feelings_about_move: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub others_involved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_important: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_factors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailing_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_contact_method: Option<ContactMethod>,
}

impl FormUpdate {
    /// Record a raw answer for `field`, converting it for the enum-valued
    /// fields. Referral source is only ever entered by hand and is ignored.
    pub fn set(&mut self, field: IntakeField, answer: &str) {
        let text = Some(answer.to_string());
        match field {
            IntakeField::Name => self.name = text,
            IntakeField::Location => self.location = text,
            IntakeField::FamilyMemberName => self.family_member_name = text,
            IntakeField::ReasonForCall => self.reason_for_call = text,
            IntakeField::GreatestConcern => self.greatest_concern = text,
            IntakeField::Impact => self.impact = text,
            IntakeField::CurrentResidence => self.current_residence = text,
            IntakeField::DailyRoutine => self.daily_routine = text,
            IntakeField::EnjoysDoing => self.enjoys_doing = text,
            IntakeField::AwareLooking => {
                self.aware_looking = Some(AwareLooking::from_answer(answer))
            }
            IntakeField::FeelingsAboutMove => self.feelings_about_move = text,
            IntakeField::OthersInvolved => self.others_involved = text,
            IntakeField::MostImportant => self.most_important = text,
            IntakeField::ConfidenceFactors => self.confidence_factors = text,
            IntakeField::Recap => self.recap = text,
            IntakeField::Email => self.email = text,
            IntakeField::MailingAddress => self.mailing_address = text,
            IntakeField::PreferredContactMethod => {
                self.preferred_contact_method = match ContactMethod::parse(answer) {
                    ContactMethod::Unset => None,
                    method => Some(method),
                }
            }
            IntakeField::ReferralSource => {}
        }
    }

    /// The value carried for `field`, if any.
    pub fn get(&self, field: IntakeField) -> Option<&str> {
        match field {
            IntakeField::Name => self.name.as_deref(),
            IntakeField::Location => self.location.as_deref(),
            IntakeField::FamilyMemberName => self.family_member_name.as_deref(),
            IntakeField::ReasonForCall => self.reason_for_call.as_deref(),
            IntakeField::GreatestConcern => self.greatest_concern.as_deref(),
            IntakeField::Impact => self.impact.as_deref(),
            IntakeField::CurrentResidence => self.current_residence.as_deref(),
            IntakeField::DailyRoutine => self.daily_routine.as_deref(),
            IntakeField::EnjoysDoing => self.enjoys_doing.as_deref(),
            IntakeField::AwareLooking => self.aware_looking.as_ref().map(AwareLooking::as_str),
            IntakeField::FeelingsAboutMove => self.feelings_about_move.as_deref(),
            IntakeField::OthersInvolved => self.others_involved.as_deref(),
            IntakeField::MostImportant => self.most_important.as_deref(),
            IntakeField::ConfidenceFactors => self.confidence_factors.as_deref(),
            IntakeField::Recap => self.recap.as_deref(),
            IntakeField::Email => self.email.as_deref(),
            IntakeField::MailingAddress => self.mailing_address.as_deref(),
            IntakeField::PreferredContactMethod => self
                .preferred_contact_method
                .as_ref()
                .map(ContactMethod::as_str),
            IntakeField::ReferralSource => None,
        }
    }

    /// Fields this update carries a value for.
    pub fn defined_fields(&self) -> Vec<IntakeField> {
        IntakeField::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_some())
            .collect()
    }
}

/// The structured intake record the rest of the client reads and edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeForm {
    pub name: String,
    pub location: String,
    pub family_member_name: String,
    pub reason_for_call: String,
    pub greatest_concern: String,
    pub impact: String,
    pub current_residence: String,
    pub daily_routine: String,
    pub enjoys_doing: String,
    pub aware_looking: AwareLooking,
    pub feelings_about_move: String,
    pub others_involved: String,
    pub most_important: String,
    pub confidence_factors: String,
    pub recap: String,
    pub email: String,
    pub mailing_address: String,
    pub preferred_contact_method: ContactMethod,
    pub referral_source: String,
}

impl IntakeForm {
    /// Apply an extraction pass. Fields the update carries a non-empty value
    /// for are overwritten; everything else is left as it was.
    ///
    /// Returns the fields whose value changed.
    pub fn merge(&mut self, update: &FormUpdate) -> Vec<IntakeField> {
        let mut changed = Vec::new();
        for field in IntakeField::ALL {
            let Some(value) = update.get(field) else {
                continue;
            };
            if value.is_empty() || self.value(field) == value {
                continue;
            }
            self.set_field(field, value);
            changed.push(field);
        }
        changed
    }

    /// Overwrite a single field, as when the user edits the form by hand.
    /// Enum-valued fields parse leniently; unknown text leaves them unset.
    pub fn set_field(&mut self, field: IntakeField, value: &str) {
        let text = value.to_string();
        match field {
            IntakeField::Name => self.name = text,
            IntakeField::Location => self.location = text,
            IntakeField::FamilyMemberName => self.family_member_name = text,
            IntakeField::ReasonForCall => self.reason_for_call = text,
            IntakeField::GreatestConcern => self.greatest_concern = text,
            IntakeField::Impact => self.impact = text,
            IntakeField::CurrentResidence => self.current_residence = text,
            IntakeField::DailyRoutine => self.daily_routine = text,
            IntakeField::EnjoysDoing => self.enjoys_doing = text,
            IntakeField::AwareLooking => self.aware_looking = AwareLooking::parse(value),
            IntakeField::FeelingsAboutMove => self.feelings_about_move = text,
            IntakeField::OthersInvolved => self.others_involved = text,
            IntakeField::MostImportant => self.most_important = text,
            IntakeField::ConfidenceFactors => self.confidence_factors = text,
            IntakeField::Recap => self.recap = text,
            IntakeField::Email => self.email = text,
            IntakeField::MailingAddress => self.mailing_address = text,
            IntakeField::PreferredContactMethod => {
                self.preferred_contact_method = ContactMethod::parse(value)
            }
            IntakeField::ReferralSource => self.referral_source = text,
        }
    }

    /// Current value of `field`; empty when unset.
    pub fn value(&self, field: IntakeField) -> &str {
        match field {
            IntakeField::Name => &self.name,
            IntakeField::Location => &self.location,
            IntakeField::FamilyMemberName => &self.family_member_name,
            IntakeField::ReasonForCall => &self.reason_for_call,
            IntakeField::GreatestConcern => &self.greatest_concern,
            IntakeField::Impact => &self.impact,
            IntakeField::CurrentResidence => &self.current_residence,
            IntakeField::DailyRoutine => &self.daily_routine,
            IntakeField::EnjoysDoing => &self.enjoys_doing,
            IntakeField::AwareLooking => self.aware_looking.as_str(),
            IntakeField::FeelingsAboutMove => &self.feelings_about_move,
            IntakeField::OthersInvolved => &self.others_involved,
            IntakeField::MostImportant => &self.most_important,
            IntakeField::ConfidenceFactors => &self.confidence_factors,
            IntakeField::Recap => &self.recap,
            IntakeField::Email => &self.email,
            IntakeField::MailingAddress => &self.mailing_address,
            IntakeField::PreferredContactMethod => self.preferred_contact_method.as_str(),
            IntakeField::ReferralSource => &self.referral_source,
        }
    }

    /// Reset the yes/no and contact-method selections.
    pub fn clear_flags(&mut self) {
        self.aware_looking = AwareLooking::Unset;
        self.preferred_contact_method = ContactMethod::Unset;
    }

    /// Render the filled fields as a markdown section, grouped by stage.
    pub fn to_summary(&self) -> String {
        let mut parts = vec!["# Intake Form".to_string()];

        for stage in Stage::ALL {
            let filled: Vec<String> = IntakeField::for_stage(stage)
                .into_iter()
                .filter(|f| !self.value(*f).is_empty())
                .map(|f| format!("- **{}:** {}", f.label(), self.value(f)))
                .collect();
            if filled.is_empty() {
                continue;
            }
            parts.push(format!("\n## {}", stage.label()));
            parts.extend(filled);
        }

        if !self.email.is_empty() {
            parts.push(format!("\n- **{}:** {}", IntakeField::Email.label(), self.email));
        }

        parts.join("\n")
    }
}
