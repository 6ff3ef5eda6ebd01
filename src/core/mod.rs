pub mod details;
pub mod outcome;
pub mod types;

pub use details::{NOT_AVAILABLE, PackageDetails};
pub use outcome::{BackendElevationRule, OperationOutcome, OutcomeRules};
pub use types::{
    Backend, Capabilities, InstallationOptions, InstallationScope, ManagerStatus, OperationKind,
    Package, PackageKey, UpgradablePackage,
};
