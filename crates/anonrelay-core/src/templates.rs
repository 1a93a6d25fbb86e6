use std::{collections::HashMap, fs, path::Path, sync::OnceLock};

use regex::Regex;

use crate::{errors::Error, Result};

/// Message templates the relay knows how to send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateId {
    Header,
    Forbidden,
    Subscribed,
    Ineligible,
    Ack,
}

impl TemplateId {
    pub const ALL: [TemplateId; 5] = [
        TemplateId::Header,
        TemplateId::Forbidden,
        TemplateId::Subscribed,
        TemplateId::Ineligible,
        TemplateId::Ack,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TemplateId::Header => "header",
            TemplateId::Forbidden => "forbidden",
            TemplateId::Subscribed => "subscribed",
            TemplateId::Ineligible => "ineligible",
            TemplateId::Ack => "ack",
        }
    }

    /// Placeholders a template may reference.
    pub fn placeholders(self) -> &'static [&'static str] {
        match self {
            TemplateId::Header => &["counter", "id"],
            TemplateId::Ineligible => &["role"],
            TemplateId::Forbidden | TemplateId::Subscribed | TemplateId::Ack => &[],
        }
    }
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex")
    })
}

/// Validated template map (id -> format string with `{name}` placeholders).
#[derive(Clone, Debug)]
pub struct Templates {
    texts: HashMap<TemplateId, String>,
}

impl Templates {
    /// Load a TOML table of `id = "text"` entries.
    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read templates {}: {e}", path.display()))
        })?;
        Self::from_toml(&txt)
    }

    pub fn from_toml(txt: &str) -> Result<Self> {
        let raw: HashMap<String, String> =
            toml::from_str(txt).map_err(|e| Error::Template(format!("invalid templates: {e}")))?;
        Self::from_map(raw)
    }

    pub fn from_map(mut raw: HashMap<String, String>) -> Result<Self> {
        let mut texts = HashMap::new();
        for id in TemplateId::ALL {
            let text = raw
                .remove(id.key())
                .ok_or_else(|| Error::Template(format!("missing template `{}`", id.key())))?;
            validate(id, &text)?;
            texts.insert(id, text);
        }
        Ok(Self { texts })
    }

    /// Substitute `args` into template `id`. Every placeholder must be supplied.
    pub fn render(&self, id: TemplateId, args: &[(&str, &str)]) -> Result<String> {
        let text = self
            .texts
            .get(&id)
            .ok_or_else(|| Error::Template(format!("missing template `{}`", id.key())))?;

        for cap in token_re().captures_iter(text) {
            if let Some(name) = cap.get(1) {
                if !args.iter().any(|(k, _)| *k == name.as_str()) {
                    return Err(Error::Template(format!(
                        "template `{}` needs argument `{}`",
                        id.key(),
                        name.as_str()
                    )));
                }
            }
        }

        let out = token_re().replace_all(text, |cap: &regex::Captures<'_>| match cap.get(1) {
            Some(name) => args
                .iter()
                .find(|(k, _)| *k == name.as_str())
                .map(|(_, v)| v.to_string())
                .unwrap_or_default(),
            None => cap[0][..1].to_string(),
        });
        Ok(out.into_owned())
    }
}

fn validate(id: TemplateId, text: &str) -> Result<()> {
    let allowed = id.placeholders();
    for cap in token_re().captures_iter(text) {
        let Some(name) = cap.get(1) else {
            continue;
        };
        if !allowed.contains(&name.as_str()) {
            return Err(Error::Template(format!(
                "template `{}` uses unknown placeholder `{}` (allowed: {:?})",
                id.key(),
                name.as_str(),
                allowed
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) const SAMPLE: &str = r#"
header = "Anonymous #{counter} [{id}]"
forbidden = "Only the group owner may do that."
subscribed = "Subscribed to this channel."
ineligible = "You need the {role} role to post anonymously."
ack = "Your message was posted."
"#;
