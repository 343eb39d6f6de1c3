//! Scalar vocabulary shared by the structure hierarchy: elements, coordinates, and
//! residue identifiers.

use nalgebra::Point3;
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

/// Cartesian position in ångströms.
pub type Point = Point3<f64>;

macro_rules! periodic_table {
    ($($sym:ident = $z:literal => $mass:literal,)+) => {
        /// Chemical element, discriminated by atomic number.
        ///
        /// `Unknown` covers blank or unrecognised element columns; writers emit it as an
        /// empty field.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Element {
            $($sym = $z,)+
            Unknown = 0,
        }

        impl Element {
            const ALL: &'static [Element] = &[$(Element::$sym,)+];

            /// Canonical symbol with standard capitalisation (`"Fe"`), or `"Unknown"`.
            pub fn symbol(&self) -> &'static str {
                match self {
                    $(Element::$sym => stringify!($sym),)+
                    Element::Unknown => "Unknown",
                }
            }

            /// Standard atomic weight in daltons; `0.0` for [`Element::Unknown`].
            pub fn atomic_mass(&self) -> f64 {
                match self {
                    $(Element::$sym => $mass,)+
                    Element::Unknown => 0.0,
                }
            }
        }
    };
}

periodic_table! {
    H = 1 => 1.00794,
    He = 2 => 4.002602,
    Li = 3 => 6.941,
    Be = 4 => 9.012182,
    B = 5 => 10.811,
    C = 6 => 12.0107,
    N = 7 => 14.0067,
    O = 8 => 15.9994,
    F = 9 => 18.9984032,
    Ne = 10 => 20.1797,
    Na = 11 => 22.98976928,
    Mg = 12 => 24.3050,
    Al = 13 => 26.9815386,
    Si = 14 => 28.0855,
    P = 15 => 30.973762,
    S = 16 => 32.065,
    Cl = 17 => 35.453,
    Ar = 18 => 39.948,
    K = 19 => 39.0983,
    Ca = 20 => 40.078,
    Sc = 21 => 44.955912,
    Ti = 22 => 47.867,
    V = 23 => 50.9415,
    Cr = 24 => 51.9961,
    Mn = 25 => 54.938045,
    Fe = 26 => 55.845,
    Co = 27 => 58.933195,
    Ni = 28 => 58.6934,
    Cu = 29 => 63.546,
    Zn = 30 => 65.38,
    Ga = 31 => 69.723,
    Ge = 32 => 72.64,
    As = 33 => 74.92160,
    Se = 34 => 78.96,
    Br = 35 => 79.904,
    Kr = 36 => 83.798,
    Rb = 37 => 85.4678,
    Sr = 38 => 87.62,
    Y = 39 => 88.90585,
    Zr = 40 => 91.224,
    Nb = 41 => 92.90638,
    Mo = 42 => 95.96,
    Tc = 43 => 98.0,
    Ru = 44 => 101.07,
    Rh = 45 => 102.90550,
    Pd = 46 => 106.42,
    Ag = 47 => 107.8682,
    Cd = 48 => 112.411,
    In = 49 => 114.818,
    Sn = 50 => 118.710,
    Sb = 51 => 121.760,
    Te = 52 => 127.60,
    I = 53 => 126.90447,
    Xe = 54 => 131.293,
    Cs = 55 => 132.9054519,
    Ba = 56 => 137.327,
    La = 57 => 138.90547,
    Ce = 58 => 140.116,
    Pr = 59 => 140.90765,
    Nd = 60 => 144.242,
    Pm = 61 => 145.0,
    Sm = 62 => 150.36,
    Eu = 63 => 151.964,
    Gd = 64 => 157.25,
    Tb = 65 => 158.92535,
    Dy = 66 => 162.500,
    Ho = 67 => 164.93032,
    Er = 68 => 167.259,
    Tm = 69 => 168.93421,
    Yb = 70 => 173.054,
    Lu = 71 => 174.9668,
    Hf = 72 => 178.49,
    Ta = 73 => 180.94788,
    W = 74 => 183.84,
    Re = 75 => 186.207,
    Os = 76 => 190.23,
    Ir = 77 => 192.217,
    Pt = 78 => 195.084,
    Au = 79 => 196.966569,
    Hg = 80 => 200.59,
    Tl = 81 => 204.3833,
    Pb = 82 => 207.2,
    Bi = 83 => 208.98040,
    Po = 84 => 209.0,
    At = 85 => 210.0,
    Rn = 86 => 222.0,
    Fr = 87 => 223.0,
    Ra = 88 => 226.0,
    Ac = 89 => 227.0,
    Th = 90 => 232.03806,
    Pa = 91 => 231.03588,
    U = 92 => 238.02891,
    Np = 93 => 237.0,
    Pu = 94 => 244.0,
    Am = 95 => 243.0,
    Cm = 96 => 247.0,
    Bk = 97 => 247.0,
    Cf = 98 => 251.0,
    Es = 99 => 252.0,
    Fm = 100 => 257.0,
    Md = 101 => 258.0,
    No = 102 => 259.0,
    Lr = 103 => 262.0,
    Rf = 104 => 267.0,
    Db = 105 => 268.0,
    Sg = 106 => 271.0,
    Bh = 107 => 272.0,
    Hs = 108 => 270.0,
    Mt = 109 => 276.0,
    Ds = 110 => 281.0,
    Rg = 111 => 280.0,
    Cn = 112 => 285.0,
    Nh = 113 => 284.0,
    Fl = 114 => 289.0,
    Mc = 115 => 288.0,
    Lv = 116 => 293.0,
    Ts = 117 => 294.0,
    Og = 118 => 294.0,
}

impl Element {
    /// Looks up an element by atomic number.
    pub fn from_atomic_number(z: u8) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|el| *el as u8 == z)
            .unwrap_or(Element::Unknown)
    }

    pub fn is_known(&self) -> bool {
        *self != Element::Unknown
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Element {
    type Err = String;

    /// Parses symbols case-insensitively (`"FE"`, `"fe"`, `"Fe"`) or atomic numbers.
    /// Anything unrecognised maps to [`Element::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(z) = s.parse::<u8>() {
            return Ok(Self::from_atomic_number(z));
        }

        let mut chars = s.chars();
        let normalized: String = match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(|c| c.to_lowercase()))
                .collect(),
            None => return Ok(Element::Unknown),
        };

        Ok(Self::ALL
            .iter()
            .copied()
            .find(|el| el.symbol() == normalized)
            .unwrap_or(Element::Unknown))
    }
}

/// Hetero flag of a residue identifier.
///
/// Mirrors the first member of the classic `(hetfield, resseq, icode)` triple: blank for
/// polymer residues, `W` for waters, and `H_<resname>` for other heterogens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HetField {
    Standard,
    Water,
    Hetero(SmolStr),
}

impl HetField {
    /// Builds the field from a one-character record flag (`' '`, `'W'`, `'H'`).
    ///
    /// Any other flag character is treated as a heterogen.
    pub fn from_flag(flag: char, resname: &str) -> Self {
        match flag {
            ' ' => HetField::Standard,
            'W' => HetField::Water,
            _ => HetField::Hetero(SmolStr::new(resname)),
        }
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, HetField::Standard)
    }

    /// One-character flag as it appears in the hetfield, used to choose record types.
    pub fn flag(&self) -> char {
        match self {
            HetField::Standard => ' ',
            HetField::Water => 'W',
            HetField::Hetero(_) => 'H',
        }
    }
}

impl fmt::Display for HetField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HetField::Standard => write!(f, " "),
            HetField::Water => write!(f, "W"),
            HetField::Hetero(name) => write!(f, "H_{}", name),
        }
    }
}

/// Residue identifier `(hetfield, seq, icode)`, unique within a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueId {
    pub hetfield: HetField,
    pub seq: i32,
    /// Insertion code; `' '` when absent.
    pub icode: char,
}

impl ResidueId {
    pub fn new(hetfield: HetField, seq: i32, icode: char) -> Self {
        Self {
            hetfield,
            seq,
            icode,
        }
    }

    /// Identifier of a polymer residue without an insertion code.
    pub fn standard(seq: i32) -> Self {
        Self::new(HetField::Standard, seq, ' ')
    }
}

impl fmt::Display for ResidueId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "('{}', {}, '{}')", self.hetfield, self.seq, self.icode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_symbol_and_mass_come_from_the_table() {
        assert_eq!(Element::C.symbol(), "C");
        assert_eq!(Element::Fe.symbol(), "Fe");
        assert_eq!(Element::Unknown.symbol(), "Unknown");
        assert_eq!(Element::C.atomic_mass(), 12.0107);
        assert_eq!(Element::Unknown.atomic_mass(), 0.0);
    }

    #[test]
    fn element_from_str_is_case_insensitive() {
        assert_eq!(Element::from_str("FE").unwrap(), Element::Fe);
        assert_eq!(Element::from_str("fe").unwrap(), Element::Fe);
        assert_eq!(Element::from_str(" Se ").unwrap(), Element::Se);
        assert_eq!(Element::from_str("N").unwrap(), Element::N);
    }

    #[test]
    fn element_from_str_accepts_atomic_numbers() {
        assert_eq!(Element::from_str("6").unwrap(), Element::C);
        assert_eq!(Element::from_str("26").unwrap(), Element::Fe);
        assert_eq!(Element::from_str("0").unwrap(), Element::Unknown);
        assert_eq!(Element::from_str("119").unwrap(), Element::Unknown);
    }

    #[test]
    fn element_from_str_maps_garbage_to_unknown() {
        assert_eq!(Element::from_str("").unwrap(), Element::Unknown);
        assert_eq!(Element::from_str("Zz").unwrap(), Element::Unknown);
        assert_eq!(Element::from_str("Unknown").unwrap(), Element::Unknown);
    }

    #[test]
    fn hetfield_round_trips_through_flags() {
        assert_eq!(HetField::from_flag(' ', "ALA"), HetField::Standard);
        assert_eq!(HetField::from_flag('W', "HOH"), HetField::Water);
        assert_eq!(
            HetField::from_flag('H', "FUC"),
            HetField::Hetero(SmolStr::new("FUC"))
        );
        assert_eq!(HetField::Hetero(SmolStr::new("FUC")).flag(), 'H');
        assert_eq!(HetField::Hetero(SmolStr::new("FUC")).to_string(), "H_FUC");
    }

    #[test]
    fn residue_id_display_matches_tuple_notation() {
        let id = ResidueId::new(HetField::Standard, 42, 'A');
        assert_eq!(id.to_string(), "(' ', 42, 'A')");
        assert_eq!(ResidueId::standard(7).icode, ' ');
    }
}
