//! XML rule-set descriptor parsing.

use super::{PatternSpec, RuleOverride, RulesetError};
use crate::rule::PropertyValue;
use crate::types::Severity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One `<rule>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleEntry {
    /// The `ref` attribute.
    pub reference: String,
    /// `<severity>` level.
    pub severity: Option<u8>,
    /// `<type>`.
    pub kind: Option<Severity>,
    /// `<message>`.
    pub message: Option<String>,
    /// `<properties>` in document order.
    pub properties: Vec<(String, PropertyValue)>,
    /// `<exclude name="...">` references.
    pub excludes: Vec<String>,
    /// `<exclude-pattern>` entries scoped to this rule.
    pub exclude_patterns: Vec<PatternSpec>,
}

impl RuleEntry {
    /// Override settings carried by this entry.
    #[must_use]
    pub fn to_override(&self) -> RuleOverride {
        RuleOverride {
            severity: self.severity,
            kind: self.kind,
            message: self.message.clone(),
            properties: self.properties.iter().cloned().collect(),
            exclude_patterns: self.exclude_patterns.clone(),
        }
    }
}

/// A parsed rule-set descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesetDescriptor {
    /// The `name` attribute of the root element.
    pub name: Option<String>,
    /// `<description>` text.
    pub description: Option<String>,
    /// Directory relative references resolve against.
    pub base_dir: Option<PathBuf>,
    /// Rules in document order.
    pub rules: Vec<RuleEntry>,
    /// Root-level `<exclude-pattern>` entries.
    pub exclude_patterns: Vec<PatternSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    Description,
    Severity,
    Type,
    Message,
    ExcludePattern { relative: bool },
}

struct PendingProperty {
    name: Option<String>,
    value: Option<String>,
    is_array: bool,
    elements: Vec<String>,
}

fn attributes(e: &BytesStart<'_>) -> HashMap<String, String> {
    e.attributes()
        .flatten()
        .map(|attr| {
            (
                String::from_utf8_lossy(attr.key.as_ref()).to_string(),
                String::from_utf8_lossy(&attr.value).to_string(),
            )
        })
        .collect()
}

#[derive(Default)]
struct Builder {
    descriptor: RulesetDescriptor,
    rule: Option<RuleEntry>,
    property: Option<PendingProperty>,
    target: Option<TextTarget>,
    text: String,
}

impl Builder {
    fn open(&mut self, name: &str, attrs: &HashMap<String, String>, empty: bool) {
        match name {
            "ruleset" => self.descriptor.name = attrs.get("name").cloned(),
            "rule" => {
                let Some(reference) = attrs.get("ref") else {
                    warn!("Ignoring <rule> without a ref attribute");
                    return;
                };
                let entry = RuleEntry {
                    reference: reference.trim().to_string(),
                    ..RuleEntry::default()
                };
                if empty {
                    self.descriptor.rules.push(entry);
                } else {
                    self.rule = Some(entry);
                }
            }
            "exclude" => match (self.rule.as_mut(), attrs.get("name")) {
                (Some(rule), Some(excluded)) => rule.excludes.push(excluded.trim().to_string()),
                _ => warn!("Ignoring <exclude> outside a rule or without a name"),
            },
            "property" if self.rule.is_some() => {
                let pending = PendingProperty {
                    name: attrs.get("name").cloned(),
                    value: attrs.get("value").cloned(),
                    is_array: attrs.get("type").is_some_and(|t| t == "array"),
                    elements: Vec::new(),
                };
                if empty {
                    self.finish_property(pending);
                } else {
                    self.property = Some(pending);
                }
            }
            "element" => {
                if let (Some(property), Some(value)) = (self.property.as_mut(), attrs.get("value")) {
                    property.is_array = true;
                    property.elements.push(value.clone());
                }
            }
            "description" if !empty => self.start_text(TextTarget::Description),
            "severity" if !empty => self.start_text(TextTarget::Severity),
            "type" if !empty => self.start_text(TextTarget::Type),
            "message" if !empty => self.start_text(TextTarget::Message),
            "exclude-pattern" if !empty => self.start_text(TextTarget::ExcludePattern {
                relative: attrs.get("type").is_some_and(|t| t == "relative"),
            }),
            _ => {}
        }
    }

    fn start_text(&mut self, target: TextTarget) {
        self.target = Some(target);
        self.text.clear();
    }

    fn close(&mut self, name: &str) {
        match name {
            "rule" => {
                if let Some(rule) = self.rule.take() {
                    self.descriptor.rules.push(rule);
                }
            }
            "property" => {
                if let Some(pending) = self.property.take() {
                    self.finish_property(pending);
                }
            }
            "description" | "severity" | "type" | "message" | "exclude-pattern" => {
                if let Some(target) = self.target.take() {
                    let text = std::mem::take(&mut self.text);
                    self.finish_text(target, text.trim());
                }
            }
            _ => {}
        }
    }

    fn finish_property(&mut self, pending: PendingProperty) {
        let Some(rule) = self.rule.as_mut() else {
            return;
        };
        let Some(name) = pending.name else {
            warn!(rule = %rule.reference, "Ignoring <property> without a name");
            return;
        };
        let value = if pending.elements.is_empty() {
            match pending.value {
                Some(raw) => PropertyValue::from_raw(&raw, pending.is_array),
                None => {
                    warn!(rule = %rule.reference, property = %name, "Ignoring <property> without a value");
                    return;
                }
            }
        } else {
            PropertyValue::List(pending.elements)
        };
        rule.properties.push((name, value));
    }

    fn finish_text(&mut self, target: TextTarget, text: &str) {
        match target {
            TextTarget::Description => self.descriptor.description = Some(text.to_string()),
            TextTarget::ExcludePattern { relative } => {
                if text.is_empty() {
                    return;
                }
                let spec = PatternSpec {
                    pattern: text.to_string(),
                    relative,
                };
                match self.rule.as_mut() {
                    Some(rule) => rule.exclude_patterns.push(spec),
                    None => self.descriptor.exclude_patterns.push(spec),
                }
            }
            TextTarget::Severity | TextTarget::Type | TextTarget::Message => {
                let Some(rule) = self.rule.as_mut() else {
                    return;
                };
                match target {
                    TextTarget::Severity => match text.parse::<u8>() {
                        Ok(level) => rule.severity = Some(level),
                        Err(_) => warn!(rule = %rule.reference, value = text, "Ignoring non-numeric <severity>"),
                    },
                    TextTarget::Type => match Severity::parse(text) {
                        Some(kind) => rule.kind = Some(kind),
                        None => warn!(rule = %rule.reference, value = text, "Ignoring unknown <type>"),
                    },
                    _ => rule.message = Some(text.to_string()),
                }
            }
        }
    }
}

impl RulesetDescriptor {
    /// Parses a descriptor. `origin` names it in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`RulesetError::Xml`] if the document is not well-formed.
    pub fn parse(xml: &str, origin: &str, base_dir: Option<&Path>) -> Result<Self, RulesetError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut builder = Builder::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    builder.open(&name, &attributes(&e), false);
                }
                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    builder.open(&name, &attributes(&e), true);
                    builder.close(&name);
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    builder.close(&name);
                }
                Ok(Event::Text(e)) => {
                    if builder.target.is_some() {
                        let text = e.unescape().map_err(|err| RulesetError::Xml {
                            origin: origin.to_string(),
                            message: err.to_string(),
                        })?;
                        builder.text.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if builder.target.is_some() {
                        builder.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(RulesetError::Xml {
                        origin: origin.to_string(),
                        message: format!("at byte {}: {e}", reader.buffer_position()),
                    })
                }
                _ => {}
            }
            buf.clear();
        }

        let mut descriptor = builder.descriptor;
        descriptor.base_dir = base_dir.map(Path::to_path_buf);
        Ok(descriptor)
    }

    /// Reads and parses a descriptor file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, RulesetError> {
        let xml = std::fs::read_to_string(path).map_err(|e| RulesetError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&xml, &path.display().to_string(), path.parent())
    }
}
