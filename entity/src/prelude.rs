pub use super::ideas::Entity as Ideas;
pub use super::similarity_alerts::Entity as SimilarityAlerts;
pub use super::users::Entity as Users;
