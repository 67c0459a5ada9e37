//! # Content Preparation
//!
//! Turns the raw [`FormState`] into the strings the template prints:
//! trimmed fields, placeholders for anything left blank, spaced-out person
//! names, parsed scripture lines, share questions and advertisement blocks.
//!
//! Nothing here measures or positions text; that is the job of
//! [`crate::layout`].

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{AdEntry, FormState};

/// Shown when no service date has been entered.
pub const DATE_PLACEHOLDER: &str = "2026년 0월 00일";
pub const UNTITLED_AD: &str = "(제목 없음)";
/// The share panel has room for this many questions.
pub const MAX_PRINTED_SHARES: usize = 4;

/// Put one space between the characters of every word: `"홍길동"` becomes
/// `"홍 길 동"`. Runs of whitespace collapse to one space.
pub fn add_inter_character_spacing(v: &str) -> String {
    v.split_whitespace()
        .map(|word| {
            let mut spaced = String::with_capacity(word.len() * 2);
            for (i, ch) in word.chars().enumerate() {
                if i > 0 {
                    spaced.push(' ');
                }
                spaced.push(ch);
            }
            spaced
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-empty, trimmed lines.
pub fn get_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn iso_date_regex() -> &'static Regex {
    static ISO_DATE: OnceLock<Regex> = OnceLock::new();
    ISO_DATE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("Invalid date regex"))
}

fn verse_regex() -> &'static Regex {
    static VERSE: OnceLock<Regex> = OnceLock::new();
    VERSE.get_or_init(|| Regex::new(r"^(\d+)\s+(.*)$").expect("Invalid verse regex"))
}

/// `"2026-03-01"` → `"2026년 3월 1일"`. Anything else → `""`.
pub fn format_date_korean(iso: &str) -> String {
    let Some(caps) = iso_date_regex().captures(iso) else {
        return String::new();
    };
    let number = |i: usize| caps[i].parse::<u32>().unwrap_or(0);
    format!("{}년 {}월 {}일", &caps[1], number(2), number(3))
}

/// One line of the scripture passage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerseLine {
    /// A blank input line, kept as vertical space.
    Spacer,
    /// `"16 For God so loved..."`: the number is set as a superscript.
    Numbered { number: String, text: String },
    Plain(String),
}

pub fn parse_verse_body(text: &str) -> Vec<VerseLine> {
    text.split('\n')
        .map(|raw| {
            let line = raw.trim();
            if line.is_empty() {
                return VerseLine::Spacer;
            }
            match verse_regex().captures(line) {
                Some(caps) => VerseLine::Numbered {
                    number: caps[1].to_string(),
                    text: caps[2].to_string(),
                },
                None => VerseLine::Plain(line.to_string()),
            }
        })
        .collect()
}

/// A printed value and whether it is a stand-in for a blank field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub text: String,
    pub placeholder: bool,
}

impl Field {
    fn entered(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            placeholder: false,
        }
    }

    /// The trimmed value, or `fallback` flagged as a placeholder.
    fn or_placeholder(value: &str, fallback: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            Self {
                text: fallback.to_string(),
                placeholder: true,
            }
        } else {
            Self::entered(value)
        }
    }

    /// A person's name, spaced out. The placeholder is spaced too.
    fn person(value: &str, fallback: &str) -> Self {
        let field = Self::or_placeholder(value, fallback);
        Self {
            text: add_inter_character_spacing(&field.text),
            ..field
        }
    }
}

/// One advertisement as printed: `"n. title"` followed by its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdBlock {
    /// 1-based position among all ad entries, skipped ones included.
    pub number: usize,
    pub title: String,
    pub lines: Vec<String>,
}

impl AdBlock {
    /// `None` when the entry has neither a title nor any body text.
    pub fn build(number: usize, title: &str, body: &str) -> Option<Self> {
        let title = title.trim();
        let lines = get_lines(body);
        if title.is_empty() && lines.is_empty() {
            return None;
        }
        Some(Self {
            number,
            title: if title.is_empty() {
                UNTITLED_AD.to_string()
            } else {
                title.to_string()
            },
            lines,
        })
    }

    pub fn heading(&self) -> String {
        format!("{}. {}", self.number, self.title)
    }
}

/// Blocks for every entry that has content, in display order.
pub fn build_ad_blocks(ads: &[AdEntry]) -> Vec<AdBlock> {
    ads.iter()
        .enumerate()
        .filter_map(|(idx, ad)| AdBlock::build(idx + 1, &ad.title, &ad.body))
        .collect()
}

/// `"나눔 n. q"`, or `"나눔 n."` for an empty question.
pub fn share_line(n: usize, q: &str) -> String {
    let q = q.trim();
    if q.is_empty() {
        format!("나눔 {}.", n)
    } else {
        format!("나눔 {}. {}", n, q)
    }
}

/// Everything the template prints, derived from one form state.
#[derive(Debug, Clone, PartialEq)]
pub struct BulletinContent {
    pub date: String,
    /// Printed under the cover header; may be blank.
    pub header_verse: String,
    /// Song list, one per line.
    pub praise: Field,
    pub response_praise: Vec<String>,
    pub prayer_leader: Field,
    pub offering_leader: Field,
    pub ad_leader: Field,
    pub preacher: Field,
    pub benediction: Field,
    /// `“title”` on the cover, placeholder when blank.
    pub sermon_title: Field,
    /// `“title”` on the share panel; `“설교제목”` when blank.
    pub share_title: String,
    /// `(ref)`, when a reference was entered.
    pub sermon_ref: Option<String>,
    pub verses: Vec<VerseLine>,
    /// Every share question; the print panel uses the first four.
    pub shares: Vec<String>,
    pub ads: Vec<AdBlock>,
    pub show_qr: bool,
    pub ads_many: bool,
}

impl BulletinContent {
    pub fn from_form(form: &FormState) -> Self {
        let date = form.date.trim();
        let title = form.sermon_title.trim();
        let sermon_ref = form.sermon_ref.trim();

        let offering_leader = if form.offering_leader.trim().is_empty() {
            // The congregation gives together; not a missing value.
            Field::entered("다같이")
        } else {
            Field::person(&form.offering_leader, "")
        };

        let verses = if form.sermon_body.trim().is_empty() {
            Vec::new()
        } else {
            parse_verse_body(&form.sermon_body)
        };

        Self {
            date: if date.is_empty() {
                DATE_PLACEHOLDER.to_string()
            } else {
                date.to_string()
            },
            header_verse: form.header_verse.clone(),
            praise: Field::or_placeholder(&get_lines(&form.praise).join("\n"), "(찬양 콘티 기입)"),
            response_praise: get_lines(&form.response_praise),
            prayer_leader: Field::person(&form.prayer_leader, "(대표기도)"),
            offering_leader,
            ad_leader: Field::person(&form.ad_leader, "(광고)"),
            preacher: Field::person(&form.sermon_preacher, "(말씀선포)"),
            benediction: Field::person(&form.benediction, "(축도)"),
            sermon_title: if title.is_empty() {
                Field::or_placeholder("", "(설교 제목 기입)")
            } else {
                Field::entered(format!("“{}”", title))
            },
            share_title: if title.is_empty() {
                "“설교제목”".to_string()
            } else {
                format!("“{}”", title)
            },
            sermon_ref: (!sermon_ref.is_empty()).then(|| format!("({})", sermon_ref)),
            verses,
            shares: form
                .shares
                .iter()
                .enumerate()
                .map(|(i, s)| share_line(i + 1, &s.q))
                .collect(),
            ads: build_ad_blocks(&form.ads),
            show_qr: form.show_qr,
            ads_many: form.ads_many,
        }
    }

    /// The share lines that fit the print panel.
    pub fn printed_shares(&self) -> &[String] {
        let n = self.shares.len().min(MAX_PRINTED_SHARES);
        &self.shares[..n]
    }
}
