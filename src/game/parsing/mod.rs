pub mod beatmap;
pub mod skin_ini;
