//! Outline sub-resource fetcher.
//!
//! One call fetches one section kind for one course. The service routinely
//! answers `false`, `null`, or an empty collection for courses that simply
//! have no data of a kind; those are classified as [`Fetched::Absent`], never
//! as errors, so the retry loop does not chase them. Only transport failures
//! and unparseable payloads surface as `Err`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use scraper::Html;
use serde_json::{Map, Value};
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{
    Config, OutlineBase, OutlineDescription, OutlineSection, SectionKind, Term, TextFallback,
    UnitHoursEntry, WeeklyPlanEntry,
};

/// Outcome of one sub-resource call: structured data, or a well-formed
/// "this course has no data of this kind" answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    Data(T),
    Absent,
}

/// Source of outline sections and fallback text.
///
/// The pipeline depends on this seam rather than on the HTTP client, so its
/// retry and fallback policy can be exercised without a network.
#[async_trait]
pub trait OutlineSource: Send + Sync {
    /// Perform exactly one network call for one section kind.
    async fn fetch_section(
        &self,
        term: Term,
        course_id: &str,
        kind: SectionKind,
        timeout: Duration,
    ) -> Result<Fetched<OutlineSection>>;

    /// Try the alternate document routes and return the first rendered text
    /// long enough to count as data.
    async fn fetch_fallback(
        &self,
        term: Term,
        course_id: &str,
        timeout: Duration,
    ) -> Result<Option<TextFallback>>;
}

/// HTTP implementation of [`OutlineSource`] against the timetable service.
pub struct OutlineClient {
    client: reqwest::Client,
    base_url: Url,
    fallback_routes: Vec<String>,
    fallback_min_graphemes: usize,
    fallback_max_graphemes: usize,
}

impl OutlineClient {
    /// Build a client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

        let client = reqwest::Client::builder()
            .user_agent(&config.crawler.user_agent)
            .timeout(Duration::from_secs(config.crawler.timeout_secs))
            .default_headers(headers)
            .danger_accept_invalid_certs(config.crawler.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(&config.endpoints.base_url)?,
            fallback_routes: config.endpoints.fallback_routes.clone(),
            fallback_min_graphemes: config.retry.fallback_min_graphemes,
            fallback_max_graphemes: config.retry.fallback_max_graphemes,
        })
    }

    /// Service URL for a route, e.g. `{base}?r=main/getCrsOutlineBase`.
    fn route_url(&self, route: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(Some(&format!("r={route}")));
        url
    }
}

#[async_trait]
impl OutlineSource for OutlineClient {
    async fn fetch_section(
        &self,
        term: Term,
        course_id: &str,
        kind: SectionKind,
        timeout: Duration,
    ) -> Result<Fetched<OutlineSection>> {
        let form = [
            ("acy", term.year.to_string()),
            ("sem", term.semester.code().to_string()),
            ("cos_id", course_id.to_string()),
            ("user", String::new()),
            ("_token", String::new()),
        ];

        let response = self
            .client
            .post(self.route_url(kind.route()))
            .form(&form)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status {
                status: status.as_u16(),
                context: kind.route().to_string(),
            });
        }

        let body = response.text().await?;
        let value: Value =
            serde_json::from_str(&body).map_err(|e| AppError::malformed(kind.route(), e))?;
        Ok(classify_section(kind, &value))
    }

    async fn fetch_fallback(
        &self,
        term: Term,
        course_id: &str,
        timeout: Duration,
    ) -> Result<Option<TextFallback>> {
        let query = [
            ("acy", term.year.to_string()),
            ("sem", term.semester.code().to_string()),
            ("cos_id", course_id.to_string()),
        ];

        for route in &self.fallback_routes {
            let response = match self
                .client
                .get(self.route_url(route))
                .query(&query)
                .timeout(timeout)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    log::debug!("Fallback route {route} failed for {course_id}: {e}");
                    continue;
                }
            };

            if !response.status().is_success() {
                log::debug!(
                    "Fallback route {route} answered {} for {course_id}",
                    response.status()
                );
                continue;
            }

            let html = match response.text().await {
                Ok(t) => t,
                Err(e) => {
                    log::debug!("Fallback route {route} body failed for {course_id}: {e}");
                    continue;
                }
            };

            let text = rendered_text(&html);
            if let Some(text) = accept_fallback_text(
                &text,
                self.fallback_min_graphemes,
                self.fallback_max_graphemes,
            ) {
                return Ok(Some(TextFallback {
                    text,
                    source: route.clone(),
                }));
            }
        }

        Ok(None)
    }
}

/// Classify one response payload for one kind.
///
/// `false`, `null`, an empty collection, or a shape that does not match the
/// kind all mean the course has no data of this kind.
fn classify_section(kind: SectionKind, value: &Value) -> Fetched<OutlineSection> {
    match kind {
        SectionKind::Base => match value.as_object() {
            Some(obj) if !obj.is_empty() => {
                let base = OutlineBase {
                    name: field(obj, "cos_name"),
                    eng_name: field(obj, "cos_eng_name"),
                    course_type: field(obj, "sel_type_name"),
                    course_type_eng: field(obj, "sel_type_eng_name"),
                    department: field(obj, "dep_name"),
                    department_eng: field(obj, "depEName"),
                    code: field(obj, "cos_code"),
                    teacher_hours: field(obj, "teacher_hours"),
                    total_teacher_hours: field(obj, "total_teacher_hours"),
                };
                // The service returns skeleton objects for unknown courses.
                if base.name.is_empty() {
                    Fetched::Absent
                } else {
                    Fetched::Data(OutlineSection::Base(base))
                }
            }
            _ => Fetched::Absent,
        },

        SectionKind::Description => match value.as_object() {
            Some(obj) if !obj.is_empty() => {
                Fetched::Data(OutlineSection::Description(OutlineDescription {
                    prerequisite: field(obj, "crs_prerequisite"),
                    syllabus: field(obj, "crs_outline"),
                    textbook: field(obj, "crs_textbook"),
                    grading: field(obj, "crs_exam_score"),
                    teaching_method: field(obj, "crs_teach_method"),
                    meeting_time: field(obj, "crs_meeting_time"),
                    meeting_place: field(obj, "crs_meeting_place"),
                    contact: field(obj, "crs_contact"),
                }))
            }
            _ => Fetched::Absent,
        },

        SectionKind::WeeklyPlan => match value.as_array() {
            Some(rows) if !rows.is_empty() => {
                let weeks: Vec<WeeklyPlanEntry> = rows
                    .iter()
                    .filter_map(|row| row.as_object())
                    .map(|obj| WeeklyPlanEntry {
                        week: field(obj, "week_id"),
                        date: field(obj, "class_date"),
                        topic: field(obj, "class_data"),
                        teachers: field(obj, "teacherDataJson"),
                    })
                    .collect();
                if weeks.is_empty() {
                    Fetched::Absent
                } else {
                    Fetched::Data(OutlineSection::WeeklyPlan(weeks))
                }
            }
            _ => Fetched::Absent,
        },

        SectionKind::UnitHours => match value.as_array() {
            Some(rows) if !rows.is_empty() => {
                let units: Vec<UnitHoursEntry> = rows
                    .iter()
                    .filter_map(|row| row.as_object())
                    .map(|obj| UnitHoursEntry {
                        title: field(obj, "opt_title"),
                        content: field(obj, "opt_content"),
                        lecture_hours: field(obj, "opt_hour_teaching"),
                        demo_hours: field(obj, "opt_hour_demo"),
                        exercise_hours: field(obj, "opt_hour_exercise"),
                        other_hours: field(obj, "opt_hour_other"),
                        memo: field(obj, "opt_memo"),
                    })
                    .collect();
                if units.is_empty() {
                    Fetched::Absent
                } else {
                    Fetched::Data(OutlineSection::UnitHours(units))
                }
            }
            _ => Fetched::Absent,
        },
    }
}

/// Tolerant string field extraction; the service mixes strings and numbers.
fn field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Whitespace-normalized text content of an HTML document.
fn rendered_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let joined = document.root_element().text().collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Accept fallback text when it is long enough, truncating oversized pages.
///
/// Lengths are counted in graphemes: the upstream pages are CJK, where byte
/// counts would overstate the content threefold.
fn accept_fallback_text(text: &str, min_graphemes: usize, max_graphemes: usize) -> Option<String> {
    let count = text.graphemes(true).count();
    if count < min_graphemes {
        return None;
    }
    if count > max_graphemes {
        Some(text.graphemes(true).take(max_graphemes).collect())
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn false_sentinel_is_absent_not_error() {
        for kind in SectionKind::ALL {
            assert_eq!(classify_section(kind, &json!(false)), Fetched::Absent);
            assert_eq!(classify_section(kind, &json!(null)), Fetched::Absent);
        }
    }

    #[test]
    fn empty_collections_are_absent() {
        assert_eq!(
            classify_section(SectionKind::Base, &json!({})),
            Fetched::Absent
        );
        assert_eq!(
            classify_section(SectionKind::WeeklyPlan, &json!([])),
            Fetched::Absent
        );
        assert_eq!(
            classify_section(SectionKind::UnitHours, &json!([])),
            Fetched::Absent
        );
    }

    #[test]
    fn wrong_shape_for_kind_is_absent() {
        // Array where an object is expected and vice versa.
        assert_eq!(
            classify_section(SectionKind::Base, &json!([{"cos_name": "x"}])),
            Fetched::Absent
        );
        assert_eq!(
            classify_section(SectionKind::WeeklyPlan, &json!({"week_id": 1})),
            Fetched::Absent
        );
        assert_eq!(
            classify_section(SectionKind::Description, &json!("oops")),
            Fetched::Absent
        );
    }

    #[test]
    fn base_requires_a_course_name() {
        let skeleton = json!({"cos_code": "515001", "dep_name": ""});
        assert_eq!(
            classify_section(SectionKind::Base, &skeleton),
            Fetched::Absent
        );

        let real = json!({"cos_name": "資料結構", "cos_code": "515001"});
        match classify_section(SectionKind::Base, &real) {
            Fetched::Data(OutlineSection::Base(base)) => {
                assert_eq!(base.name, "資料結構");
                assert_eq!(base.code, "515001");
                assert_eq!(base.department, "");
            }
            other => panic!("expected base data, got {other:?}"),
        }
    }

    #[test]
    fn weekly_plan_rows_map_and_tolerate_numbers() {
        let rows = json!([
            {"week_id": 1, "class_date": "2025-09-08", "class_data": "Intro"},
            {"week_id": "2", "class_date": "2025-09-15", "class_data": "Lists"}
        ]);
        match classify_section(SectionKind::WeeklyPlan, &rows) {
            Fetched::Data(OutlineSection::WeeklyPlan(weeks)) => {
                assert_eq!(weeks.len(), 2);
                assert_eq!(weeks[0].week, "1");
                assert_eq!(weeks[1].week, "2");
                assert_eq!(weeks[0].topic, "Intro");
                assert_eq!(weeks[0].teachers, "");
            }
            other => panic!("expected weekly plan, got {other:?}"),
        }
    }

    #[test]
    fn unit_hours_rows_map_fields() {
        let rows = json!([{
            "opt_title": "Unit 1",
            "opt_content": "Arrays",
            "opt_hour_teaching": "3",
            "opt_hour_demo": "0",
            "opt_hour_exercise": "1",
            "opt_hour_other": "0",
            "opt_memo": ""
        }]);
        match classify_section(SectionKind::UnitHours, &rows) {
            Fetched::Data(OutlineSection::UnitHours(units)) => {
                assert_eq!(units[0].title, "Unit 1");
                assert_eq!(units[0].lecture_hours, "3");
            }
            other => panic!("expected unit hours, got {other:?}"),
        }
    }

    #[test]
    fn rendered_text_strips_markup_and_normalizes_whitespace() {
        let html = "<html><body><h2>課程綱要</h2>\n  <p>week   one</p></body></html>";
        assert_eq!(rendered_text(html), "課程綱要 week one");
    }

    #[test]
    fn fallback_text_threshold_counts_graphemes() {
        let short = "課程".repeat(10); // 20 graphemes, 60 bytes
        assert!(accept_fallback_text(&short, 100, 1000).is_none());

        let long = "課".repeat(150);
        let accepted = accept_fallback_text(&long, 100, 1000).unwrap();
        assert_eq!(accepted.graphemes(true).count(), 150);
    }

    #[test]
    fn fallback_text_is_truncated_to_the_cap() {
        let long = "綱".repeat(2_000);
        let accepted = accept_fallback_text(&long, 100, 1_000).unwrap();
        assert_eq!(accepted.graphemes(true).count(), 1_000);
    }
}
