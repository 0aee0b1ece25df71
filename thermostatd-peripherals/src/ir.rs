pub mod dry_run;
pub mod lirc;

pub use dry_run::DryRun;
pub use lirc::Lirc;

/// Remote profile registered with lircd for the supported appliance family.
pub const DEFAULT_REMOTE: &str = "fujitsu_heat_ac";
