//! # Form Model
//!
//! The input representation for the renderer: everything a user types into
//! the bulletin form. The model is intentionally flat. Text fields are kept
//! exactly as entered (untrimmed) so that saving and restoring a form never
//! rewrites what the user typed; trimming and placeholder substitution
//! happen in [`crate::content`].
//!
//! Advertisements come in two flavours. *Variable* ads are added, removed and
//! reordered freely. *Default* ads are standing announcements that always
//! follow the variable ones; they are locked until explicitly unlocked and
//! removing one requires confirmation.

pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::format_date_korean;

/// The complete, persisted state of the bulletin form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormState {
    /// Service date as displayed, e.g. "2026년 3월 1일".
    pub date: String,
    /// The ISO date last picked (`YYYY-MM-DD`).
    pub date_picker: String,
    pub sermon_title: String,
    /// Verse printed under the cover header. May be blank.
    pub header_verse: String,
    /// Praise set list, one song per line.
    pub praise: String,
    pub response_praise: String,
    pub prayer_leader: String,
    pub offering_leader: String,
    pub ad_leader: String,
    /// Scripture passage; lines starting with a number are verses.
    pub sermon_body: String,
    pub sermon_ref: String,
    pub sermon_preacher: String,
    pub benediction: String,
    pub show_qr: bool,
    /// Many-ads mode: the primary ad region moves to the inner sheet.
    pub ads_many: bool,
    pub ads: Vec<AdEntry>,
    pub shares: Vec<ShareEntry>,
}

/// One advertisement as entered in the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdEntry {
    pub title: String,
    pub body: String,
    pub is_default: bool,
    /// Default ads are read-only until unlocked. Not persisted.
    #[serde(skip)]
    pub unlocked: bool,
}

/// One small-group sharing question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareEntry {
    pub q: String,
}

/// Why a form edit was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// Index past the end of the list.
    #[error("index {} is out of range (list has {len} entries)", .index + 1)]
    OutOfRange { index: usize, len: usize },
    /// Default ads stay last and keep their order.
    #[error("default ads cannot be reordered")]
    DefaultAdFixed,
    /// Removing a default ad needs `confirm = true`.
    #[error("removing '{label}' needs confirmation")]
    NeedsConfirmation { label: String },
    /// The default ad is locked; unlock it first.
    #[error("'{label}' is locked; unlock it first")]
    Locked { label: String },
    /// Unknown field name for [`FormState::set_field`].
    #[error("unknown field '{0}'")]
    UnknownField(String),
    /// The picker value is not `YYYY-MM-DD`.
    #[error("'{0}' is not a YYYY-MM-DD date")]
    BadDate(String),
}

impl AdEntry {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            is_default: false,
            unlocked: false,
        }
    }

    fn standing(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            is_default: true,
            unlocked: false,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.is_default && !self.unlocked
    }
}

/// The two standing announcements every fresh form starts with.
pub fn default_ads() -> Vec<AdEntry> {
    vec![
        AdEntry::standing(
            "새가족 안내",
            "새가족 등록을 원하시는 분은 예배 후 2층 로비에서 처음마을 리더(임현경)에게 문의",
        ),
        AdEntry::standing(
            "온라인 헌금 안내",
            "- 청년부 온라인 헌금 계좌 : 신한 100-034-286804\n\
             - 예금주 : 꿈꾸는교회 박종철\n\
             - 이체 시 '성명 + 생년월일 + 헌금 종류'로 표기 (예. 김꿈청900301십)",
        ),
    ]
}

impl Default for FormState {
    fn default() -> Self {
        let mut ads = vec![AdEntry::default()];
        ads.extend(default_ads());
        Self {
            date: String::new(),
            date_picker: String::new(),
            sermon_title: String::new(),
            header_verse: String::new(),
            praise: String::new(),
            response_praise: String::new(),
            prayer_leader: String::new(),
            offering_leader: String::new(),
            ad_leader: String::new(),
            sermon_body: String::new(),
            sermon_ref: String::new(),
            sermon_preacher: String::new(),
            benediction: String::new(),
            show_qr: false,
            ads_many: false,
            ads,
            shares: vec![ShareEntry::default()],
        }
    }
}

impl FormState {
    /// Number of variable (non-default) ads. They always come first.
    pub fn variable_ad_count(&self) -> usize {
        self.ads.iter().filter(|a| !a.is_default).count()
    }

    /// Restore the "variable first, defaults last" order, keeping the
    /// relative order inside each group. Restored files may be out of order.
    pub fn normalize(&mut self) {
        let (mut variable, defaults): (Vec<_>, Vec<_>) =
            self.ads.drain(..).partition(|a| !a.is_default);
        variable.extend(defaults);
        self.ads = variable;
    }

    /// Form labels: "광고 n" for variable ads, the title (or "기본광고")
    /// for default ads.
    pub fn ad_labels(&self) -> Vec<String> {
        let mut n = 0;
        self.ads
            .iter()
            .map(|ad| {
                if ad.is_default {
                    let name = ad.title.trim();
                    if name.is_empty() {
                        "기본광고".to_string()
                    } else {
                        name.to_string()
                    }
                } else {
                    n += 1;
                    format!("광고 {}", n)
                }
            })
            .collect()
    }

    /// Append an empty variable ad after the other variable ads.
    /// Returns its index.
    pub fn add_ad(&mut self) -> usize {
        let at = self.variable_ad_count();
        self.ads.insert(at, AdEntry::default());
        at
    }

    pub fn remove_ad(&mut self, index: usize, confirm: bool) -> Result<AdEntry, EditError> {
        let len = self.ads.len();
        let ad = self
            .ads
            .get(index)
            .ok_or(EditError::OutOfRange { index, len })?;
        if ad.is_default && !confirm {
            let label = self.ad_labels().swap_remove(index);
            return Err(EditError::NeedsConfirmation { label });
        }
        Ok(self.ads.remove(index))
    }

    /// Move a variable ad to another slot among the variable ads.
    pub fn move_ad(&mut self, from: usize, to: usize) -> Result<(), EditError> {
        let variable = self.variable_ad_count();
        if from >= self.ads.len() {
            return Err(EditError::OutOfRange {
                index: from,
                len: self.ads.len(),
            });
        }
        if from >= variable || to >= variable {
            return Err(EditError::DefaultAdFixed);
        }
        let ad = self.ads.remove(from);
        self.ads.insert(to, ad);
        Ok(())
    }

    /// Replace an ad's title and body. Locked default ads refuse edits.
    pub fn set_ad(&mut self, index: usize, title: &str, body: &str) -> Result<(), EditError> {
        let len = self.ads.len();
        let locked = self
            .ads
            .get(index)
            .ok_or(EditError::OutOfRange { index, len })?
            .is_locked();
        if locked {
            let label = self.ad_labels().swap_remove(index);
            return Err(EditError::Locked { label });
        }
        let ad = &mut self.ads[index];
        ad.title = title.to_string();
        ad.body = body.to_string();
        Ok(())
    }

    /// Toggle the edit lock of a default ad. Variable ads are always editable.
    pub fn set_ad_editable(&mut self, index: usize, editable: bool) -> Result<(), EditError> {
        let len = self.ads.len();
        let ad = self
            .ads
            .get_mut(index)
            .ok_or(EditError::OutOfRange { index, len })?;
        if ad.is_default {
            ad.unlocked = editable;
        }
        Ok(())
    }

    pub fn add_share(&mut self) -> usize {
        self.shares.push(ShareEntry::default());
        self.shares.len() - 1
    }

    pub fn remove_share(&mut self, index: usize) -> Result<ShareEntry, EditError> {
        if index >= self.shares.len() {
            return Err(EditError::OutOfRange {
                index,
                len: self.shares.len(),
            });
        }
        Ok(self.shares.remove(index))
    }

    pub fn set_share(&mut self, index: usize, q: &str) -> Result<(), EditError> {
        let len = self.shares.len();
        let share = self
            .shares
            .get_mut(index)
            .ok_or(EditError::OutOfRange { index, len })?;
        share.q = q.to_string();
        Ok(())
    }

    /// Take an ISO date from the picker and rewrite the display date.
    pub fn set_date_from_picker(&mut self, iso: &str) -> Result<(), EditError> {
        let formatted = format_date_korean(iso);
        if formatted.is_empty() {
            return Err(EditError::BadDate(iso.to_string()));
        }
        self.date_picker = iso.to_string();
        self.date = formatted;
        Ok(())
    }

    /// Set a scalar field by its persisted (camelCase) name. Toggles accept
    /// `true/false/on/off/1/0`.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), EditError> {
        let slot = match name {
            "date" => &mut self.date,
            "datePicker" => return self.set_date_from_picker(value),
            "sermonTitle" => &mut self.sermon_title,
            "headerVerse" => &mut self.header_verse,
            "praise" => &mut self.praise,
            "responsePraise" => &mut self.response_praise,
            "prayerLeader" => &mut self.prayer_leader,
            "offeringLeader" => &mut self.offering_leader,
            "adLeader" => &mut self.ad_leader,
            "sermonBody" => &mut self.sermon_body,
            "sermonRef" => &mut self.sermon_ref,
            "sermonPreacher" => &mut self.sermon_preacher,
            "benediction" => &mut self.benediction,
            "showQr" => {
                self.show_qr = parse_toggle(value)?;
                return Ok(());
            }
            "adsMany" => {
                self.ads_many = parse_toggle(value)?;
                return Ok(());
            }
            other => return Err(EditError::UnknownField(other.to_string())),
        };
        *slot = value.to_string();
        Ok(())
    }
}

fn parse_toggle(value: &str) -> Result<bool, EditError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" => Ok(false),
        other => Err(EditError::UnknownField(format!("toggle value '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fresh_form_has_one_variable_ad_and_two_defaults() {
        let form = FormState::default();
        assert_eq!(form.ads.len(), 3);
        assert!(!form.ads[0].is_default);
        assert!(form.ads[1].is_default && form.ads[2].is_default);
        assert_eq!(form.shares.len(), 1);
        assert_eq!(form.ad_labels(), vec!["광고 1", "새가족 안내", "온라인 헌금 안내"]);
    }

    #[test]
    fn add_ad_goes_before_defaults() {
        let mut form = FormState::default();
        let idx = form.add_ad();
        assert_eq!(idx, 1);
        assert!(!form.ads[1].is_default);
        assert!(form.ads[2].is_default);
        assert_eq!(form.ad_labels()[..2], ["광고 1", "광고 2"]);
    }

    #[test]
    fn removing_default_ad_needs_confirmation() {
        let mut form = FormState::default();
        let err = form.remove_ad(1, false).unwrap_err();
        assert_eq!(
            err,
            EditError::NeedsConfirmation {
                label: "새가족 안내".to_string()
            }
        );
        assert_eq!(form.ads.len(), 3);

        let removed = form.remove_ad(1, true).unwrap();
        assert_eq!(removed.title, "새가족 안내");
        assert_eq!(form.ads.len(), 2);
    }

    #[test]
    fn variable_ads_reorder_but_defaults_do_not() {
        let mut form = FormState::default();
        form.set_ad(0, "A", "").unwrap();
        let b = form.add_ad();
        form.set_ad(b, "B", "").unwrap();

        form.move_ad(1, 0).unwrap();
        assert_eq!(form.ads[0].title, "B");
        assert_eq!(form.ads[1].title, "A");

        assert_eq!(form.move_ad(0, 2), Err(EditError::DefaultAdFixed));
        assert_eq!(form.move_ad(3, 0), Err(EditError::DefaultAdFixed));
    }

    #[test]
    fn locked_default_ad_refuses_edits_until_unlocked() {
        let mut form = FormState::default();
        assert!(matches!(form.set_ad(1, "x", "y"), Err(EditError::Locked { .. })));
        form.set_ad_editable(1, true).unwrap();
        form.set_ad(1, "x", "y").unwrap();
        assert_eq!(form.ads[1].title, "x");
        assert_eq!(form.ad_labels()[1], "x");
    }

    #[test]
    fn edit_errors_read_as_one_based_messages() {
        let mut form = FormState::default();
        let err = form.remove_share(4).unwrap_err();
        assert_eq!(err.to_string(), "index 5 is out of range (list has 1 entries)");

        let err: Box<dyn std::error::Error> = Box::new(EditError::Locked {
            label: "새가족 안내".to_string(),
        });
        assert_eq!(err.to_string(), "'새가족 안내' is locked; unlock it first");
    }

    #[test]
    fn normalize_moves_defaults_last() {
        let mut form = FormState::default();
        form.ads.rotate_left(1);
        assert!(form.ads[0].is_default);
        form.normalize();
        assert!(!form.ads[0].is_default);
        assert_eq!(form.ads[1].title, "새가족 안내");
    }

    #[test]
    fn date_picker_rewrites_display_date() {
        let mut form = FormState::default();
        form.set_field("datePicker", "2026-03-01").unwrap();
        assert_eq!(form.date, "2026년 3월 1일");
        assert_eq!(form.date_picker, "2026-03-01");
        assert!(matches!(
            form.set_date_from_picker("03/01/2026"),
            Err(EditError::BadDate(_))
        ));
    }

    #[test]
    fn set_field_handles_text_and_toggles() {
        let mut form = FormState::default();
        form.set_field("sermonTitle", "은혜").unwrap();
        form.set_field("adsMany", "on").unwrap();
        assert_eq!(form.sermon_title, "은혜");
        assert!(form.ads_many);
        assert!(matches!(
            form.set_field("nope", "x"),
            Err(EditError::UnknownField(_))
        ));
    }

    #[test]
    fn persisted_keys_are_camel_case() {
        let json = serde_json::to_value(FormState::default()).unwrap();
        assert!(json.get("sermonTitle").is_some());
        assert!(json.get("adsMany").is_some());
        assert_eq!(json["ads"][1]["isDefault"], true);
        assert!(json["ads"][1].get("unlocked").is_none());
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let form: FormState = serde_json::from_str(r#"{"sermonTitle": "빛"}"#).unwrap();
        assert_eq!(form.sermon_title, "빛");
        assert_eq!(form.ads.len(), 3);
    }

    #[test]
    fn share_edits() {
        let mut form = FormState::default();
        form.set_share(0, "무엇을 느꼈나요?").unwrap();
        let idx = form.add_share();
        assert_eq!(idx, 1);
        assert!(form.remove_share(5).is_err());
        form.remove_share(1).unwrap();
        assert_eq!(form.shares, vec![ShareEntry { q: "무엇을 느꼈나요?".into() }]);
    }
}
