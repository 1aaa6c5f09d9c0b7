//! Course outline data structures.
//!
//! An outline is assembled from up to four independently fetched sections;
//! a course whose sections all came back empty gets no outline at all. The
//! text fallback stands in only when no structured section succeeded.

use serde::{Deserialize, Serialize};

/// The four independently fetchable outline section kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Base,
    Description,
    WeeklyPlan,
    UnitHours,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Base,
        SectionKind::Description,
        SectionKind::WeeklyPlan,
        SectionKind::UnitHours,
    ];

    /// Route query value on the remote service.
    pub fn route(&self) -> &'static str {
        match self {
            SectionKind::Base => "main/getCrsOutlineBase",
            SectionKind::Description => "main/getCrsOutlineDescription",
            SectionKind::WeeklyPlan => "main/getCrsOutlineSyllabuses",
            SectionKind::UnitHours => "main/getCrsOutlineOptional",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::Base => "base",
            SectionKind::Description => "description",
            SectionKind::WeeklyPlan => "weekly plan",
            SectionKind::UnitHours => "unit hours",
        }
    }
}

/// Names, codes, and hour totals from the base endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineBase {
    pub name: String,
    pub eng_name: String,
    pub course_type: String,
    pub course_type_eng: String,
    pub department: String,
    pub department_eng: String,
    pub code: String,
    pub teacher_hours: String,
    pub total_teacher_hours: String,
}

/// Free-text syllabus fields from the description endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineDescription {
    pub prerequisite: String,
    pub syllabus: String,
    pub textbook: String,
    pub grading: String,
    pub teaching_method: String,
    pub meeting_time: String,
    pub meeting_place: String,
    pub contact: String,
}

/// One week of the published course plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPlanEntry {
    pub week: String,
    pub date: String,
    pub topic: String,
    pub teachers: String,
}

/// One teaching unit with its hour breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitHoursEntry {
    pub title: String,
    pub content: String,
    pub lecture_hours: String,
    pub demo_hours: String,
    pub exercise_hours: String,
    pub other_hours: String,
    pub memo: String,
}

/// Coarse text extracted from a rendered document page, used only when no
/// structured section succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFallback {
    pub text: String,
    /// Route the text was extracted from.
    pub source: String,
}

/// One successfully fetched, typed outline section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineSection {
    Base(OutlineBase),
    Description(OutlineDescription),
    WeeklyPlan(Vec<WeeklyPlanEntry>),
    UnitHours(Vec<UnitHoursEntry>),
}

/// Per-course outline attachment.
///
/// Invariant: an `Outline` is only ever attached to a course when at least
/// one of its fields is populated; [`Outline::is_empty`] guards that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<OutlineBase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<OutlineDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_plan: Option<Vec<WeeklyPlanEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_hours: Option<Vec<UnitHoursEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_fallback: Option<TextFallback>,
}

impl Outline {
    /// True when no section succeeded; such an outline must not be attached.
    pub fn is_empty(&self) -> bool {
        self.base.is_none()
            && self.description.is_none()
            && self.weekly_plan.is_none()
            && self.unit_hours.is_none()
            && self.text_fallback.is_none()
    }

    /// Attach a fetched section in its slot.
    pub fn attach(&mut self, section: OutlineSection) {
        match section {
            OutlineSection::Base(base) => self.base = Some(base),
            OutlineSection::Description(desc) => self.description = Some(desc),
            OutlineSection::WeeklyPlan(weeks) => self.weekly_plan = Some(weeks),
            OutlineSection::UnitHours(units) => self.unit_hours = Some(units),
        }
    }

    /// Wrap fallback text as a complete outline.
    pub fn from_fallback(fallback: TextFallback) -> Self {
        Self {
            text_fallback: Some(fallback),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_outline_is_empty() {
        assert!(Outline::default().is_empty());
    }

    #[test]
    fn attach_fills_the_matching_slot() {
        let mut outline = Outline::default();
        outline.attach(OutlineSection::Description(OutlineDescription {
            syllabus: "sorting, trees, graphs".to_string(),
            ..OutlineDescription::default()
        }));

        assert!(!outline.is_empty());
        assert!(outline.base.is_none());
        assert_eq!(outline.description.unwrap().syllabus, "sorting, trees, graphs");
    }

    #[test]
    fn empty_sections_are_omitted_from_json() {
        let outline = Outline::from_fallback(TextFallback {
            text: "rendered page text".to_string(),
            source: "course/syllabus".to_string(),
        });

        let json = serde_json::to_value(&outline).unwrap();
        assert!(json.get("base").is_none());
        assert!(json.get("weekly_plan").is_none());
        assert_eq!(json["text_fallback"]["source"], "course/syllabus");
    }
}
