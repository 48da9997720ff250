//! Serves recorded outputs back, in order, per port and method.

use std::collections::{HashMap, VecDeque};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::format::Cassette;
use super::recorder::is_error;
use super::CassetteError;
use crate::ports::PortError;

/// Per `port::method` queues of recorded outputs.
///
/// Calls to different ports may interleave differently on replay than they
/// did while recording; only the order within one port/method pair matters.
#[derive(Debug)]
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Value>>,
}

impl CassetteReplayer {
    /// Indexes `cassette` for replay.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), VecDeque<Value>> = HashMap::new();
        for i in &cassette.interactions {
            queues
                .entry((i.port.clone(), i.method.clone()))
                .or_default()
                .push_back(i.output.clone());
        }
        Self { queues }
    }

    /// Takes the next recorded output for `port::method`.
    ///
    /// # Errors
    ///
    /// Returns [`CassetteError::Exhausted`] when nothing is left for the pair.
    pub fn next_output(&mut self, port: &str, method: &str) -> Result<Value, CassetteError> {
        let key = (port.to_string(), method.to_string());
        if let Some(output) = self.queues.get_mut(&key).and_then(VecDeque::pop_front) {
            return Ok(output);
        }
        let mut available: Vec<String> =
            self.queues.keys().map(|(p, m)| format!("{p}::{m}")).collect();
        available.sort();
        Err(CassetteError::Exhausted {
            port: port.to_string(),
            method: method.to_string(),
            available: available.join(", "),
        })
    }

    /// Takes the next output and decodes its `{"Ok": ..}` / `{"Err": ..}` envelope.
    ///
    /// # Errors
    ///
    /// Returns the recorded error message, an exhaustion error, or a decode error.
    pub fn next_result<T: DeserializeOwned>(
        &mut self,
        port: &str,
        method: &str,
    ) -> Result<T, PortError> {
        let output = self.next_output(port, method)?;
        if is_error(&output) {
            let message = output["Err"].as_str().unwrap_or("recorded error").to_string();
            return Err(message.into());
        }
        let value = output.get("Ok").cloned().unwrap_or(output);
        Ok(serde_json::from_value(value)?)
    }
}
