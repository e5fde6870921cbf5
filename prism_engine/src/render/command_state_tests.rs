//! Unit tests for command_state.rs

use crate::error::Error;
use crate::render::command_state::{CommandOp, CommandState};

const ALL_STATES: [CommandState; 6] = [
    CommandState::Unset,
    CommandState::Begin,
    CommandState::BeginPass,
    CommandState::EndPass,
    CommandState::End,
    CommandState::Submit,
];

#[test]
fn test_full_cycle_with_two_passes() {
    let mut state = CommandState::default();
    for op in [
        CommandOp::Begin,
        CommandOp::BeginPass,
        CommandOp::EndPass,
        CommandOp::BeginPass,
        CommandOp::EndPass,
        CommandOp::End,
        CommandOp::Submit,
        CommandOp::Begin,
    ] {
        state = state.apply(op).unwrap();
    }
    assert_eq!(state, CommandState::Begin);
}

#[test]
fn test_empty_recording_is_legal() {
    let state = CommandState::Unset.apply(CommandOp::Begin).unwrap();
    let state = state.apply(CommandOp::End).unwrap();
    assert_eq!(state.apply(CommandOp::Submit).unwrap(), CommandState::Submit);
}

#[test]
fn test_legal_sources_per_op() {
    let legal = |op: CommandOp| -> Vec<CommandState> {
        ALL_STATES.iter().copied().filter(|s| s.apply(op).is_ok()).collect()
    };
    assert_eq!(legal(CommandOp::Begin), vec![CommandState::Unset, CommandState::Submit]);
    assert_eq!(legal(CommandOp::BeginPass), vec![CommandState::Begin, CommandState::EndPass]);
    assert_eq!(legal(CommandOp::EndPass), vec![CommandState::BeginPass]);
    assert_eq!(legal(CommandOp::End), vec![CommandState::Begin, CommandState::EndPass]);
    assert_eq!(legal(CommandOp::Submit), vec![CommandState::End]);
}

#[test]
fn test_illegal_transition_is_validation_error() {
    let err = CommandState::BeginPass.apply(CommandOp::End).unwrap_err();
    assert!(matches!(err, Error::ValidationError(msg) if msg.contains("BeginPass")));
}

#[test]
fn test_destroy_safety() {
    assert!(CommandState::Unset.safe_to_destroy());
    assert!(CommandState::Submit.safe_to_destroy());
    assert!(!CommandState::End.safe_to_destroy());
    assert!(CommandState::BeginPass.in_pass());
}
