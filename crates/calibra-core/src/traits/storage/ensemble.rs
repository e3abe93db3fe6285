//! `IEnsembleStore` — the full storage surface the rollout controller
//! consumes, as one object-safe supertrait.

use super::accuracy::IAccuracyStore;
use super::experiments::IExperimentStore;
use super::reliability::IReliabilitySource;
use super::settings::ITenantSettings;
use super::weights::IWeightLedger;

/// Everything the evaluation & rollout controller needs from storage.
/// Auto-implemented for any type providing the five component traits.
pub trait IEnsembleStore:
    IAccuracyStore + IReliabilitySource + IWeightLedger + IExperimentStore + ITenantSettings
{
}

impl<T> IEnsembleStore for T where
    T: IAccuracyStore + IReliabilitySource + IWeightLedger + IExperimentStore + ITenantSettings
{
}
