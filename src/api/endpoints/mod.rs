pub mod checklist;
pub mod clients;
pub mod documents;
pub mod health;
pub mod intakes;
