//! Panel state output for the render layer, one JSON line per change.

use rollcall_core::{DisplayMode, Identity, PanelView};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct PortraitInfo {
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize)]
struct PanelLine<'a> {
    at_ms: u64,
    mode: DisplayMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    major: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    standing: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    starting_year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_attendance: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    portrait: Option<PortraitInfo>,
}

impl<'a> PanelLine<'a> {
    fn from_view(view: &'a PanelView) -> Self {
        let card = view.card.as_ref();
        let profile = card.map(|c| &c.profile);
        Self {
            at_ms: u64::try_from(view.at.as_millis()).unwrap_or(u64::MAX),
            mode: view.mode,
            identity: card.map(|c| c.identity.as_str()),
            name: profile.and_then(|p| p.name.as_deref()),
            major: profile.and_then(|p| p.major.as_deref()),
            standing: profile.and_then(|p| p.standing.as_deref()),
            year: profile.and_then(|p| p.year),
            starting_year: profile.and_then(|p| p.starting_year),
            total_attendance: profile.and_then(|p| p.total_attendance),
            portrait: card
                .and_then(|c| c.portrait.as_ref())
                .map(|img| PortraitInfo {
                    width: img.width(),
                    height: img.height(),
                }),
        }
    }
}

type PanelKey = (DisplayMode, Option<Identity>, Option<u64>);

/// Writes a line whenever the mode, the displayed identity, or its
/// attendance total changes.
pub struct PanelWriter<W> {
    out: W,
    last: Option<PanelKey>,
}

impl<W: Write> PanelWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    pub fn observe(&mut self, view: &PanelView) {
        let key = (
            view.mode,
            view.identity().cloned(),
            view.card.as_ref().and_then(|c| c.profile.total_attendance),
        );
        if self.last.as_ref() == Some(&key) {
            return;
        }
        self.last = Some(key);

        if let Err(err) = self.write_line(view) {
            tracing::warn!(error = %err, "could not write panel update");
        }
    }

    fn write_line(&mut self, view: &PanelView) -> std::io::Result<()> {
        let line = serde_json::to_string(&PanelLine::from_view(view))?;
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::{DisplayCard, Profile};
    use std::time::Duration;

    fn view(at_ms: u64, card: Option<(&str, u64)>) -> PanelView {
        PanelView {
            at: Duration::from_millis(at_ms),
            mode: if card.is_some() {
                DisplayMode::Info
            } else {
                DisplayMode::Active
            },
            card: card.map(|(id, total)| DisplayCard {
                identity: Identity::from(id),
                profile: Profile {
                    name: Some("Elon Musk".into()),
                    total_attendance: Some(total),
                    ..Default::default()
                },
                portrait: None,
            }),
        }
    }

    fn lines(writer: PanelWriter<Vec<u8>>) -> Vec<serde_json::Value> {
        String::from_utf8(writer.into_inner())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_only_on_change() {
        let mut writer = PanelWriter::new(Vec::new());
        writer.observe(&view(0, None));
        writer.observe(&view(100, None));
        writer.observe(&view(200, Some(("013", 7))));
        writer.observe(&view(300, Some(("013", 7))));
        writer.observe(&view(400, Some(("013", 8))));
        writer.observe(&view(500, None));

        let out = lines(writer);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0]["mode"], "active");
        assert!(out[0].get("identity").is_none());
        assert_eq!(out[1]["identity"], "013");
        assert_eq!(out[1]["name"], "Elon Musk");
        assert_eq!(out[2]["total_attendance"], 8);
        assert_eq!(out[3]["at_ms"], 500);
    }

    #[test]
    fn test_huge_timestamp_saturates() {
        let mut writer = PanelWriter::new(Vec::new());
        writer.observe(&PanelView {
            at: Duration::MAX,
            mode: DisplayMode::Active,
            card: None,
        });
        let out = lines(writer);
        assert_eq!(out[0]["at_ms"], u64::MAX);
    }
}
