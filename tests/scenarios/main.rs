//! Scenario-based tests for mailsteps

mod helpers;

mod failure_handling;
mod history_replay;
mod step_editing;
mod success_chain;
mod variable_substitution;
