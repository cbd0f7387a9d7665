pub mod bond;
pub mod constants;
pub mod monosaccharide;
pub mod multimap;
pub mod substituent;
