pub mod scorer;
pub mod signals;

pub use scorer::{
    score_recommendation, Recommendation, RecommendationLabel, ReturnMetrics, SignalContribution,
    SignalSource,
};
pub use signals::{
    compare_lease_to_deal, summarize_forecast, CollaboratorSignal, ExternalSignals,
    LeaseComparison, LeaseSignal, LeaseTerms, RentForecastSignal, ValuationAssessment,
    ValuationSignal,
};
