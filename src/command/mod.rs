//! # Command Module
//!
//! Operator commands bound for the payload.
//!
//! Commands are validated and recorded only. There is no uplink in this
//! version: callers may rely on "accepted and recorded", never on delivery.
//!
//! ## Quick Commands
//!
//! | Template | Rendered text |
//! |----------|---------------|
//! | CX ON | `CMD,<team>,CX,ON` |
//! | SIM ENABLE | `CMD,<team>,SIM,ENABLE` |
//! | SIM ACTIVATE | `CMD,<team>,SIM,ACTIVATE` |
//! | CAL | `CMD,<team>,CAL` |
//! | Heatshield | `CMD,<team>,MEC,HEATSHIELD,ON` |

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{GroundStationError, Result};

/// A command accepted by the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRecord {
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Predefined commands offered as quick actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTemplate {
    /// Turn container telemetry on
    CxOn,
    /// Enable simulation mode
    SimEnable,
    /// Activate simulation mode
    SimActivate,
    /// Calibrate altitude to zero
    Calibrate,
    /// Deploy the heatshield mechanism
    HeatshieldOn,
}

impl CommandTemplate {
    /// Every template, in display order.
    pub const ALL: [CommandTemplate; 5] = [
        CommandTemplate::CxOn,
        CommandTemplate::SimEnable,
        CommandTemplate::SimActivate,
        CommandTemplate::Calibrate,
        CommandTemplate::HeatshieldOn,
    ];

    /// Render the command text for `team_id`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cansat_ground::command::CommandTemplate;
    ///
    /// assert_eq!(CommandTemplate::CxOn.render("1000"), "CMD,1000,CX,ON");
    /// ```
    #[must_use]
    pub fn render(&self, team_id: &str) -> String {
        let body = match self {
            CommandTemplate::CxOn => "CX,ON",
            CommandTemplate::SimEnable => "SIM,ENABLE",
            CommandTemplate::SimActivate => "SIM,ACTIVATE",
            CommandTemplate::Calibrate => "CAL",
            CommandTemplate::HeatshieldOn => "MEC,HEATSHIELD,ON",
        };
        format!("CMD,{},{}", team_id, body)
    }

    /// Button label shown by the presentation layer.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CommandTemplate::CxOn => "CXON",
            CommandTemplate::SimEnable => "SIM ENABLE",
            CommandTemplate::SimActivate => "SIM ACTIVATE",
            CommandTemplate::Calibrate => "CAL",
            CommandTemplate::HeatshieldOn => "Activate Heatshield",
        }
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Append-only record of accepted commands.
#[derive(Debug, Default, Clone)]
pub struct CommandChannel {
    records: Vec<CommandRecord>,
}

impl CommandChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command.
    ///
    /// Surrounding whitespace is trimmed; the remaining text is stored
    /// verbatim.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCommand` if `text` is blank. Nothing is recorded.
    pub fn record(&mut self, text: &str) -> Result<CommandRecord> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GroundStationError::EmptyCommand);
        }

        let record = CommandRecord {
            text: text.to_string(),
            sent_at: Utc::now(),
        };
        self.records.push(record.clone());
        Ok(record)
    }

    #[must_use]
    pub fn records(&self) -> &[CommandRecord] {
        &self.records
    }

    /// Most recently accepted command.
    #[must_use]
    pub fn last(&self) -> Option<&CommandRecord> {
        self.records.last()
    }
}
