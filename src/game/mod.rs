pub mod layout;
pub mod note;
pub mod parsing;
pub mod playfield;
pub mod scroll;
pub mod skin;
