// Library root
// -----------
// The binary (`main.rs`) wires these modules into the interactive CLI.
//
// Module responsibilities:
// - `token`: pool of single-use security tokens, refilled in bulk from
//   the issuer endpoint.
// - `http`: blocking client that attaches one token per attempt and
//   retries transient rejects.
// - `api`: typed endpoints of the booking catalog and the lottery.
// - `error`: the error kinds shared by the three modules above.
// - `wizard`: generic step machine with backward navigation.
// - `flows`: the three interactive funnels built on the wizard.
// - `ui`: terminal prompts, tables and the main menu.
//
// The flows only see the `ui` traits, so the whole interaction can run
// against scripted collaborators in tests.
pub mod api;
pub mod error;
pub mod flows;
pub mod http;
pub mod token;
pub mod ui;
pub mod wizard;
