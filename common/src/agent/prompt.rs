use crate::error::{Result, TabletalkError};

/// instruction sent to the model: a role line, fixed constraints, named
/// slots filled per call, and a closing line
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub role: &'static str,
    pub constraints: &'static [&'static str],
    pub slots: &'static [&'static str],
    pub closing: &'static str,
}

impl PromptTemplate {
    /// every declared slot must be supplied; unknown names are an error too
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String> {
        if let Some((name, _)) = values
            .iter()
            .find(|(n, _)| !self.slots.iter().any(|slot| slot == n))
        {
            return Err(TabletalkError::Synthesis(format!(
                "prompt has no slot named '{}'",
                name
            )));
        }

        let mut sections = Vec::new();

        if !self.role.is_empty() {
            sections.push(self.role.to_string());
        }

        if !self.constraints.is_empty() {
            sections.push(self.constraints.join("\n"));
        }

        if !self.slots.is_empty() {
            let mut lines = Vec::with_capacity(self.slots.len());
            for slot in self.slots {
                let value = values
                    .iter()
                    .find(|(name, _)| name == slot)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| {
                        TabletalkError::Synthesis(format!("prompt slot '{}' not provided", slot))
                    })?;

                if value.contains('\n') {
                    lines.push(format!("{}:\n{}", slot, value));
                } else {
                    lines.push(format!("{}: {}", slot, value));
                }
            }
            sections.push(lines.join("\n"));
        }

        if !self.closing.is_empty() {
            sections.push(self.closing.to_string());
        }

        Ok(sections.join("\n\n"))
    }
}

pub const SLOT_TABLE: &str = "Table Name";
pub const SLOT_COLUMNS: &str = "Columns";
pub const SLOT_TYPES: &str = "Types";
pub const SLOT_SAMPLES: &str = "Sample Rows";
pub const SLOT_QUESTION: &str = "User Question";
pub const SLOT_RESULT: &str = "Query Result";

pub const DDL_TEMPLATE: PromptTemplate = PromptTemplate {
    role: "You are a SQL expert.",
    constraints: &[
        "Generate a single SQLite CREATE TABLE statement.",
        "Use exactly the given table name.",
        "Declare every listed column once, in the listed order, with its name unchanged.",
        "Pick column types consistent with the listed types and sample values.",
    ],
    slots: &[SLOT_TABLE, SLOT_COLUMNS, SLOT_TYPES, SLOT_SAMPLES],
    closing: "Return ONLY valid SQL.",
};

pub const QUERY_TEMPLATE: PromptTemplate = PromptTemplate {
    role: "You are a SQLite SQL expert.",
    constraints: &[
        "You must generate ONLY a single SELECT query.",
        "Never modify data.",
        "Never use INSERT, UPDATE, DELETE, DROP, ALTER, CREATE.",
        "Before writing the query, consider all columns and sample rows to understand the user's intent. \
         Column names and the values stored in them can be ambiguous; use the sample rows to decide \
         which column and which literal value the question refers to.",
    ],
    slots: &[SLOT_TABLE, SLOT_COLUMNS, SLOT_TYPES, SLOT_SAMPLES],
    closing: "Return ONLY SQL.",
};

pub const SUMMARY_TEMPLATE: PromptTemplate = PromptTemplate {
    role: "You are a data analyst.",
    constraints: &[
        "Write a concise factual summary of the query result.",
        "Do not invent facts, values or records that are not in the query result.",
        "Only use the provided data.",
    ],
    slots: &[],
    closing: "",
};

pub const SUMMARY_REQUEST_TEMPLATE: PromptTemplate = PromptTemplate {
    role: "",
    constraints: &[],
    slots: &[SLOT_QUESTION, SLOT_RESULT],
    closing: "",
};
