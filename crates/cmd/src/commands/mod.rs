// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub mod delete;
pub mod transfer;
pub mod validate;
pub mod write;

pub use delete::delete_command;
pub use transfer::transfer_command;
pub use validate::validate_command;
pub use write::write_command;
