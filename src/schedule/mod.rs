pub mod classifier;
pub mod frequency;
pub mod generator;

pub use classifier::{ClassifiedPayment, ClassifierPolicy, PaymentClassifier};
pub use frequency::Frequency;
pub use generator::InstallmentSchedule;
