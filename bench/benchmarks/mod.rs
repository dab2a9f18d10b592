pub mod growth_curves;
pub mod simulation;
