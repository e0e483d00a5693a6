// SPDX-License-Identifier: Apache-2.0
mod loader;
mod schema;

pub use loader::{default_agents_dir, default_config_path, default_policies_path, load};
pub use schema::*;
