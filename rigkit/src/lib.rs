pub mod rig;

pub use rigkit_ik as ik;
pub use rigkit_math as math;
pub use rigkit_scene as scene;
pub use rigkit_utils as utils;

pub mod prelude {
    pub use crate::rig::*;
    pub use rigkit_ik::*;
    pub use rigkit_math::*;
    pub use rigkit_scene::*;
    pub use rigkit_utils::collections::*;
    pub use rigkit_utils::*;
}
