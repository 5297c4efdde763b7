pub mod resolution;
pub mod stats;
pub mod temporal;

pub use resolution::{
    build_closed_report, closed_in_window, duracion_humana, status_distribution, ClosedReport,
    ClosedTicketRow, MonthlyAverage, StatusDistribution,
};
