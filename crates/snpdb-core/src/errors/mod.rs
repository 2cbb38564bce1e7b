// SPDX-License-Identifier: Apache-2.0

mod model;

pub use model::{ConfigPathScope, Error, ErrorCode, ExitCode, MachineError, Result, ERROR_CODES};
