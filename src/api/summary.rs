use std::{collections::BTreeMap, str::FromStr};

use anyhow::Context;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::survey::SECTIONS;

/// Backend names of the skill groups, by survey section key.
const SKILL_KEYS: [(&str, &str); 10] = [
    ("Thai_do_hoc_tap", "I"),
    ("Su_dung_mang_xa_hoi", "II"),
    ("Gia_dinh_Xa_hoi", "III"),
    ("Ban_be", "IV"),
    ("Moi_truong_hoc_tap", "V"),
    ("Quan_ly_thoi_gian", "VI"),
    ("Tu_hoc", "VII"),
    ("Hop_tac_nhom", "VIII"),
    ("Tu_duy_phan_bien", "IX"),
    ("Tiep_thu_xu_ly_kien_thuc", "X"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillScore {
    pub key: String,
    pub label: String,
    pub percentage: f64,
    pub question_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillSummary {
    pub skills: Vec<SkillScore>,
    pub submitted_at: Option<String>,
}

impl SkillSummary {
    pub fn from_json(value: &Value) -> anyhow::Result<Self> {
        let entries = value
            .as_object()
            .context("survey summary is not an object")?;

        let mut skills = entries
            .iter()
            .filter(|(_, entry)| entry.get("phan_tram_diem").is_some())
            .map(|(key, entry)| {
                let percentage = get_attribute::<f64>(entry, "phan_tram_diem")
                    .context(format!("skill '{}' has no numeric phan_tram_diem", key))?;
                Ok(SkillScore {
                    key: key.clone(),
                    label: skill_label(key),
                    percentage,
                    question_count: get_attribute(entry, "tong_so_cau_hoi"),
                })
            })
            .collect::<anyhow::Result<Vec<SkillScore>>>()?;

        skills.sort_by_key(|s| skill_rank(&s.key));

        Ok(SkillSummary {
            skills,
            submitted_at: get_attribute(value, "thoi_gian_nop"),
        })
    }

    /// (label, percentage) points for a bar or radar chart.
    pub fn chart_points(&self) -> Vec<(&str, f64)> {
        self.skills
            .iter()
            .map(|s| (s.label.as_str(), s.percentage))
            .collect()
    }
}

fn skill_rank(key: &str) -> usize {
    SKILL_KEYS
        .iter()
        .position(|(name, _)| *name == key)
        .unwrap_or(SKILL_KEYS.len())
}

fn skill_label(key: &str) -> String {
    SKILL_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .and_then(|(_, section)| SECTIONS.iter().find(|s| s.key == *section))
        .map(|s| s.label.to_string())
        .unwrap_or_else(|| key.replace('_', " "))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub code: String,
    pub name: String,
    pub credits: Option<f64>,
    pub letter_grade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Semester {
    /// "YYYYT", academic start year followed by the term number
    pub code: String,
    pub name: String,
    pub gpa4: Option<f64>,
    pub cumulative_gpa4: Option<f64>,
    pub courses: Vec<Course>,

    /// (year, term) used for chronological ordering
    #[serde(skip)]
    order: (u32, u32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpaPoint {
    pub semester: String,
    pub gpa4: f64,
    pub cumulative_gpa4: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeReport {
    pub semesters: Vec<Semester>,
}

impl GradeReport {
    pub fn from_json(value: &Value) -> anyhow::Result<Self> {
        let list = value
            .get("data")
            .and_then(|d| d.get("ds_diem_hocky"))
            .and_then(Value::as_array)
            .context("no semesters in grade report")?;

        let orderer = SemesterOrder::new()?;

        let semesters = list
            .iter()
            .enumerate()
            .map(|(index, semester)| {
                let name: String = get_attribute(semester, "ten_hoc_ky")
                    .context(format!("semester {} must set ten_hoc_ky", index))?;
                let code: String = get_attribute(semester, "hoc_ky").unwrap_or_default();

                let courses: Vec<Course> = semester
                    .get("ds_diem_mon_hoc")
                    .and_then(Value::as_array)
                    .map(|courses| {
                        courses
                            .iter()
                            .map(|c| Course {
                                code: get_attribute(c, "ma_mon").unwrap_or_default(),
                                name: get_attribute(c, "ten_mon").unwrap_or_default(),
                                credits: get_decimal(c, "so_tin_chi"),
                                letter_grade: get_attribute(c, "diem_tk_chu").unwrap_or_default(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                Ok(Semester {
                    order: orderer.order(&code, &name),
                    gpa4: get_decimal(semester, "dtb_hk_he4"),
                    cumulative_gpa4: get_decimal(semester, "dtb_tich_luy_he_4"),
                    code,
                    name,
                    courses,
                })
            })
            .collect::<anyhow::Result<Vec<Semester>>>()?;

        Ok(GradeReport { semesters })
    }

    /// Per-semester GPA (4-point scale), oldest semester first.
    pub fn gpa_series(&self) -> Vec<GpaPoint> {
        let mut ordered: Vec<&Semester> = self.semesters.iter().collect();
        ordered.sort_by_key(|s| s.order);

        ordered
            .into_iter()
            .filter_map(|s| {
                s.gpa4.map(|gpa4| GpaPoint {
                    semester: s.name.clone(),
                    gpa4,
                    cumulative_gpa4: s.cumulative_gpa4,
                })
            })
            .collect()
    }

    /// How many courses received each letter grade.
    pub fn letter_grade_distribution(&self) -> BTreeMap<String, usize> {
        let mut distribution = BTreeMap::new();
        for course in self.semesters.iter().flat_map(|s| &s.courses) {
            let grade = course.letter_grade.trim();
            if !grade.is_empty() {
                *distribution.entry(grade.to_string()).or_insert(0) += 1;
            }
        }
        distribution
    }
}

struct SemesterOrder {
    code: Regex,
    term: Regex,
    year: Regex,
}

impl SemesterOrder {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            code: Regex::new(r"^(\d{4})(\d)$")?,
            term: Regex::new(r"(?i)Học kỳ\s*(\d+|III|II|IV|I|V|Hè|Phụ)")?,
            year: Regex::new(r"Năm học\s*(\d{4})")?,
        })
    }

    /// Unparseable semesters sort last.
    fn order(&self, code: &str, name: &str) -> (u32, u32) {
        if let Some(caps) = self.code.captures(code) {
            if let (Ok(year), Ok(term)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
                return (year, term);
            }
        }

        let year = self
            .year
            .captures(name)
            .and_then(|caps| caps[1].parse::<u32>().ok());
        let term = self.term.captures(name).map(|caps| match &caps[1] {
            "I" | "i" => 1,
            "II" | "ii" => 2,
            "III" | "iii" => 3,
            t if t.eq_ignore_ascii_case("IV") => 4,
            t if t.eq_ignore_ascii_case("V") => 5,
            t if t.to_lowercase() == "hè" => 3,
            t if t.to_lowercase() == "phụ" => 4,
            t => t.parse().unwrap_or(9),
        });

        match (year, term) {
            (Some(year), Some(term)) => (year, term),
            (Some(year), None) => (year, 9),
            _ => (u32::MAX, u32::MAX),
        }
    }
}

fn get_attribute<T>(value: &Value, attribute: &str) -> Option<T>
where
    T: FromStr,
{
    value.get(attribute).and_then(|v| match v {
        Value::String(s) => T::from_str(s.trim()).ok(),
        Value::Number(n) => n.as_f64().and_then(|f| T::from_str(&f.to_string()).ok()),
        Value::Bool(b) => T::from_str(&b.to_string()).ok(),
        _ => None,
    })
}

/// Numbers that may arrive as strings, possibly with a decimal comma.
fn get_decimal(value: &Value, attribute: &str) -> Option<f64> {
    get_attribute::<String>(value, attribute).and_then(|s| s.replace(',', ".").parse().ok())
}
