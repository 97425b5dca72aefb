pub mod activity_log;
pub mod brand;
pub mod category;
pub mod device;
pub mod session;
pub mod status;
pub mod technical_info;
pub mod user;

pub use activity_log::{ActivityLog, ActivityLogEntry, ActivityStats, LabelCount};
pub use brand::Brand;
pub use category::Category;
pub use device::{Device, DeviceDetails, DeviceStats, DeviceView, GroupCount, RecentRelease};
pub use session::{Session, SessionUser};
pub use status::{Availability, Status};
pub use technical_info::{NewTechnicalInfo, TechnicalInfo};
pub use user::User;
