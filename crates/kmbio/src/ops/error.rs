use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("bioassembly {id} is not defined (available: {available})")]
    UnknownBioassembly { id: String, available: String },

    #[error("structure '{structure_id}' has no model to build an assembly from")]
    EmptyStructure { structure_id: String },
}

impl Error {
    pub fn unknown_bioassembly<'a>(
        id: impl ToString,
        available: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        let available: Vec<&str> = available.into_iter().map(String::as_str).collect();
        Self::UnknownBioassembly {
            id: id.to_string(),
            available: if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            },
        }
    }
}
