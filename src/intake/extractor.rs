//! Transcript → intake form extraction.

use tracing::debug;

use super::catalog::{self, ACTIVITY_MARKER, CONCERN_MARKER, DISCOVERY_CATEGORIES};
use super::model::{FormUpdate, IntakeField};
use super::transcript::{Category, TranscriptRecord, VisitInfo};

/// Derive form values from a transcript snapshot and visit info.
///
/// Pure: the same inputs always produce the same update. Within a category
/// entries are applied in order, so a later answer to the same question
/// replaces an earlier one. Blank answers and questions the catalog doesn't
/// know are skipped.
pub fn map(record: Option<&TranscriptRecord>, visit_info: Option<&VisitInfo>) -> FormUpdate {
    let mut update = FormUpdate::default();

    if let Some(contact) = record.and_then(|r| r.contact_info.as_ref()) {
        update.name = non_empty(contact.name.as_deref());
        update.location = non_empty(contact.location.as_deref());
        update.family_member_name = non_empty(contact.loved_one_name.as_deref());
    }

    if let Some(visit) = visit_info {
        update.email = non_empty(visit.email.as_deref());
        update.mailing_address = non_empty(visit.mailing_address.as_deref());
        if let Some(method) = non_empty(visit.preferred_contact.as_deref()) {
            update.set(IntakeField::PreferredContactMethod, &method);
        }
    }

    let Some(record) = record else {
        return update;
    };

    for category in DISCOVERY_CATEGORIES {
        for entry in record.entries(category).iter().filter(|e| e.is_answered()) {
            match catalog::lookup(category, &entry.question) {
                Some(rule) => update.set(rule.target, &entry.answer),
                None => debug!(
                    %category,
                    question = %entry.question,
                    "Question not in catalog, answer not mapped"
                ),
            }
        }
    }

    update.recap = build_recap(record);
    update
}

/// Compose the "It sounds like ..." recap from whatever is known so far.
///
/// The loved one's name from the contact info is enough on its own, so the
/// recap can appear before any discovery question is answered. Returns `None`
/// when nothing is known, so an existing recap survives the merge.
pub fn build_recap(record: &TranscriptRecord) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(name) = record.loved_one_name() {
        parts.push(format!("{name} is your loved one"));
    }

    let concern = record
        .entries(Category::Situation)
        .iter()
        .filter(|e| e.is_answered())
        .find(|e| e.question.contains(CONCERN_MARKER));
    if let Some(entry) = concern {
        parts.push(format!("Your main concern is: {}", entry.answer));
    }

    let activity = record
        .entries(Category::Lifestyle)
        .iter()
        .filter(|e| e.is_answered())
        .find(|e| {
            e.question.contains(ACTIVITY_MARKER)
                || catalog::lookup(Category::Lifestyle, &e.question)
                    .is_some_and(|rule| rule.target == IntakeField::EnjoysDoing)
        });
    if let Some(entry) = activity {
        parts.push(format!("They love: {}", entry.answer));
    }

    if parts.is_empty() {
        return None;
    }
    Some(format!("It sounds like {}.", parts.join(", ")))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(String::from)
}
