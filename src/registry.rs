//! Logical field types and their storage mapping.
//!
//! Every custom field carries one of these type keys. The key decides the SQL
//! column type backing the field, whether the column gets an index, and the
//! label shown in selectors and listings.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Radio,
    Text,
    Exports,
    Select,
    Autos,
    Edits,
    Codeds,
    Multiple,
    Numeric,
    Date,
    Textarea,
}

impl FieldType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "radio" => Some(Self::Radio),
            "text" => Some(Self::Text),
            "exports" => Some(Self::Exports),
            "select" => Some(Self::Select),
            "autos" => Some(Self::Autos),
            "edits" => Some(Self::Edits),
            "codeds" => Some(Self::Codeds),
            "multiple" => Some(Self::Multiple),
            "numeric" => Some(Self::Numeric),
            "date" => Some(Self::Date),
            "textarea" => Some(Self::Textarea),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Radio => "radio",
            Self::Text => "text",
            Self::Exports => "exports",
            Self::Select => "select",
            Self::Autos => "autos",
            Self::Edits => "edits",
            Self::Codeds => "codeds",
            Self::Multiple => "multiple",
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Textarea => "textarea",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Select => "Pull-Down",
            Self::Autos => "Auto Pull-Down",
            Self::Edits => "Edit Pull-Down",
            Self::Text => "Text",
            Self::Radio => "Checkbox",
            Self::Codeds => "Coded Pull-Down",
            Self::Exports => "Export Pull-Down",
            Self::Numeric => "Number",
            Self::Multiple => "Select Multiple from Options",
            Self::Date => "Date",
            Self::Textarea => "Long Text",
        }
    }

    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Radio => "VARCHAR(1)",
            Self::Text | Self::Exports | Self::Select | Self::Autos | Self::Edits => {
                "VARCHAR(255)"
            }
            Self::Codeds => "VARCHAR(15)",
            Self::Multiple => "VARCHAR(1000)",
            Self::Numeric => "NUMERIC(20,2)",
            Self::Date => "DATE",
            Self::Textarea => "VARCHAR(5000)",
        }
    }

    /// Whether the backing column gets an index. Long-text values exceed the
    /// store's index row-size limit, so `textarea` columns stay unindexed.
    pub fn create_index(self) -> bool {
        !matches!(self, Self::Textarea)
    }

    /// Text-like pull-down types are interchangeable after creation; every
    /// other type is frozen once the field exists.
    pub fn is_text_like(self) -> bool {
        matches!(
            self,
            Self::Select | Self::Autos | Self::Edits | Self::Text | Self::Exports
        )
    }

    /// Types whose values come from a caller-defined option list, one per line.
    pub fn has_select_options(self) -> bool {
        matches!(
            self,
            Self::Autos | Self::Edits | Self::Select | Self::Codeds | Self::Multiple | Self::Exports
        )
    }
}

/// Display label for a type key. Unknown keys echo through unchanged so
/// listings keep working for types no longer offered for new fields.
pub fn type_label(key: &str) -> String {
    match FieldType::parse(key) {
        Some(t) => t.label().to_string(),
        None => key.to_string(),
    }
}

/// Full selector option set, in menu order.
pub fn type_options() -> Vec<(&'static str, &'static str)> {
    [
        FieldType::Select,
        FieldType::Autos,
        FieldType::Edits,
        FieldType::Text,
        FieldType::Radio,
        FieldType::Codeds,
        FieldType::Exports,
        FieldType::Numeric,
        FieldType::Multiple,
        FieldType::Date,
        FieldType::Textarea,
    ]
    .iter()
    .map(|t| (t.key(), t.label()))
    .collect()
}
