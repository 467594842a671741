// src/page/testing.rs

use std::collections::HashMap;

use crate::error::AdError;
use crate::model::slot::SlotPosition;
use crate::page::script_host::{ScriptHost, ScriptWrite};

/// Script host with canned behaviour per slot; unlisted slots write nothing.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    responses: HashMap<SlotPosition, Result<Vec<ScriptWrite>, String>>,
    pub executed: Vec<(SlotPosition, String)>,
}

impl ScriptedHost {
    pub fn respond(mut self, position: SlotPosition, writes: Vec<ScriptWrite>) -> Self {
        self.responses.insert(position, Ok(writes));
        self
    }

    pub fn fail(mut self, position: SlotPosition, reason: &str) -> Self {
        self.responses.insert(position, Err(reason.to_string()));
        self
    }
}

impl ScriptHost for ScriptedHost {
    fn execute(&mut self, position: SlotPosition, payload: &str) -> Result<Vec<ScriptWrite>, AdError> {
        self.executed.push((position, payload.to_string()));
        match self.responses.get(&position) {
            Some(Ok(writes)) => Ok(writes.clone()),
            Some(Err(reason)) => Err(AdError::ScriptInjection {
                position,
                reason: reason.clone(),
            }),
            None => Ok(Vec::new()),
        }
    }
}
