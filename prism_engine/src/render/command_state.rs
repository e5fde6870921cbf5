/// Command buffer recording state machine
///
/// ```text
/// Unset -> Begin -> BeginPass <-> EndPass -> End -> Submit -> Begin ...
/// ```

use crate::error::{Error, Result};

/// Recording state of a command buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Unset,
    Begin,
    BeginPass,
    EndPass,
    End,
    Submit,
}

/// Transition requested on a command buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOp {
    Begin,
    BeginPass,
    EndPass,
    End,
    Submit,
}

impl CommandState {
    /// State reached by applying `op`, or a validation error if illegal
    pub fn apply(self, op: CommandOp) -> Result<CommandState> {
        use CommandState as S;
        let next = match (op, self) {
            (CommandOp::Begin, S::Unset | S::Submit) => S::Begin,
            (CommandOp::BeginPass, S::Begin | S::EndPass) => S::BeginPass,
            (CommandOp::EndPass, S::BeginPass) => S::EndPass,
            (CommandOp::End, S::Begin | S::EndPass) => S::End,
            (CommandOp::Submit, S::End) => S::Submit,
            _ => {
                return Err(Error::ValidationError(format!(
                    "Illegal command buffer transition {:?} from state {:?}",
                    op, self
                )))
            }
        };
        Ok(next)
    }

    /// True while a render pass is open
    pub fn in_pass(self) -> bool {
        self == CommandState::BeginPass
    }

    /// True when destroying in this state cannot leak recorded work
    pub fn safe_to_destroy(self) -> bool {
        matches!(self, CommandState::Unset | CommandState::Submit)
    }
}

impl Default for CommandState {
    fn default() -> Self {
        CommandState::Unset
    }
}

#[cfg(test)]
#[path = "command_state_tests.rs"]
mod tests;
