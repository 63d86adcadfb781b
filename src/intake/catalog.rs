//! Question catalog: maps the agent's question phrasing onto form fields.
//!
//! The agent asks a fixed set of questions, some with the loved one's name
//! interpolated. Each rule names the category it applies to, how the
//! question text is matched, and which field the answer fills. Keeping this
//! as a table means a wording change on the agent side is a one-line edit
//! here.

use super::model::IntakeField;
use super::transcript::Category;

/// How a rule recognizes a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionMatcher {
    /// The question text must equal this string.
    Exact(&'static str),
    /// The question must contain both fragments, e.g. around an
    /// interpolated name.
    Surrounding {
        prefix: &'static str,
        suffix: &'static str,
    },
}

impl QuestionMatcher {
    pub fn matches(&self, question: &str) -> bool {
        match self {
            Self::Exact(text) => question == *text,
            Self::Surrounding { prefix, suffix } => {
                question.contains(prefix) && question.contains(suffix)
            }
        }
    }
}

/// One catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionRule {
    pub category: Category,
    pub matcher: QuestionMatcher,
    pub target: IntakeField,
}

/// The visit-scheduling question whose answer is the confirmed visit time.
pub const VISIT_TIME_QUESTION: &str = "What time would work best for your visit?";

/// Marker the agent appends to a visit time it has only proposed.
pub const PENDING_CONFIRMATION: &str = "pending confirmation";

/// Question fragments the recap draws on.
pub const CONCERN_MARKER: &str = "biggest concern";
pub const ACTIVITY_MARKER: &str = "love doing";

const fn exact(category: Category, question: &'static str, target: IntakeField) -> QuestionRule {
    QuestionRule {
        category,
        matcher: QuestionMatcher::Exact(question),
        target,
    }
}

const fn surrounding(
    category: Category,
    prefix: &'static str,
    suffix: &'static str,
    target: IntakeField,
) -> QuestionRule {
    QuestionRule {
        category,
        matcher: QuestionMatcher::Surrounding { prefix, suffix },
        target,
    }
}

/// Every known discovery question, grouped by category.
pub const QUESTION_CATALOG: &[QuestionRule] = &[
    // situation
    exact(
        Category::Situation,
        "What made you decide to reach out about senior living today?",
        IntakeField::ReasonForCall,
    ),
    surrounding(
        Category::Situation,
        "What's your biggest concern about",
        "right now?",
        IntakeField::GreatestConcern,
    ),
    exact(
        Category::Situation,
        "How is this situation impacting your family?",
        IntakeField::Impact,
    ),
    surrounding(
        Category::Situation,
        "Where does",
        "currently live?",
        IntakeField::CurrentResidence,
    ),
    // lifestyle
    exact(
        Category::Lifestyle,
        "Tell me about your loved one. What does a typical day look like for them?",
        IntakeField::DailyRoutine,
    ),
    exact(
        Category::Lifestyle,
        "What does he/she enjoy doing?",
        IntakeField::EnjoysDoing,
    ),
    exact(
        Category::Lifestyle,
        "What are some things they love doing?",
        IntakeField::EnjoysDoing,
    ),
    // readiness
    exact(
        Category::Readiness,
        "Is your loved one aware that you're looking at options?",
        IntakeField::AwareLooking,
    ),
    exact(
        Category::Readiness,
        "How does your loved one feel about the idea of moving?",
        IntakeField::FeelingsAboutMove,
    ),
    exact(
        Category::Readiness,
        "Who else is involved in helping make this decision?",
        IntakeField::OthersInvolved,
    ),
    // priorities
    exact(
        Category::Priorities,
        "What's most important to you regarding the community you may choose?",
        IntakeField::MostImportant,
    ),
    exact(
        Category::Priorities,
        "What would make you feel confident that this is the right decision for your family?",
        IntakeField::ConfidenceFactors,
    ),
];

/// The discovery categories the catalog covers, in scan order.
pub const DISCOVERY_CATEGORIES: [Category; 4] = [
    Category::Situation,
    Category::Lifestyle,
    Category::Readiness,
    Category::Priorities,
];

/// First rule in `category` that recognizes `question`.
pub fn lookup(category: Category, question: &str) -> Option<&'static QuestionRule> {
    QUESTION_CATALOG
        .iter()
        .filter(|rule| rule.category == category)
        .find(|rule| rule.matcher.matches(question))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_rules_need_exact_text() {
        let rule = lookup(
            Category::Situation,
            "How is this situation impacting your family?",
        )
        .unwrap();
        assert_eq!(rule.target, IntakeField::Impact);

        assert!(lookup(Category::Situation, "How is this situation impacting your family").is_none());
        assert!(lookup(Category::Situation, "how is this situation impacting your family?").is_none());
    }

    #[test]
    fn surrounding_rules_tolerate_interpolated_names() {
        for question in [
            "What's your biggest concern about Jane right now?",
            "What's your biggest concern about your mother right now?",
        ] {
            let rule = lookup(Category::Situation, question).unwrap();
            assert_eq!(rule.target, IntakeField::GreatestConcern);
        }

        let rule = lookup(Category::Situation, "Where does Jane currently live?").unwrap();
        assert_eq!(rule.target, IntakeField::CurrentResidence);

        // Both fragments are required.
        assert!(lookup(Category::Situation, "What's your biggest concern about Jane?").is_none());
    }

    #[test]
    fn rules_are_scoped_to_their_category() {
        let question = "Who else is involved in helping make this decision?";
        assert!(lookup(Category::Readiness, question).is_some());
        assert!(lookup(Category::Priorities, question).is_none());
        assert!(lookup(Category::VisitScheduling, VISIT_TIME_QUESTION).is_none());
    }

    #[test]
    fn both_activity_phrasings_fill_enjoys_doing() {
        for question in [
            "What does he/she enjoy doing?",
            "What are some things they love doing?",
        ] {
            let rule = lookup(Category::Lifestyle, question).unwrap();
            assert_eq!(rule.target, IntakeField::EnjoysDoing);
        }
    }

    #[test]
    fn every_rule_targets_a_discovery_field_in_a_discovery_category() {
        for rule in QUESTION_CATALOG {
            assert!(IntakeField::DISCOVERY.contains(&rule.target), "{:?}", rule);
            assert!(DISCOVERY_CATEGORIES.contains(&rule.category), "{:?}", rule);
        }
    }
}
