use thiserror::Error;

/// Gardiner sign codes in model output order.
///
/// The position of each code is the index of the matching logit in the
/// classifier output. This ordering was fixed when the network was trained
/// and must never be reordered.
const GARDINER_CODES: [&str; 159] = [
    "Aa13", "Aa15", "E9", "F18", "G35", "G39", "G7", "N30", "O28", "P8",
    "a1", "a19", "a2", "a24", "a30", "a40", "a42", "a50", "b1", "d1",
    "d2", "d21", "d28", "d35", "d36", "d37", "d39", "d4", "d40", "d45",
    "d46", "d52", "d54", "d55", "d58", "d60", "e1", "e23", "e34", "f1",
    "f12", "f13", "f21", "f26", "f31", "f32", "f34", "f35", "f39", "f4",
    "g1", "g14", "g17", "g25", "g36", "g37", "g38", "g40", "g43", "g5",
    "h1", "h6", "i1", "i10", "i9", "l1", "l2", "m12", "m16", "m17",
    "m18", "m2", "m20", "m23", "m3", "m42", "n1", "n14", "n18", "n25",
    "n26", "n29", "n31", "n33", "n35", "n36", "n37", "n42", "n5", "n8",
    "o1", "o29", "o3", "o34", "o4", "o49", "o50", "o6", "q1", "q2",
    "q3", "r11", "r14", "r4", "r7", "r8", "s19", "s21", "s24", "s27",
    "s28", "s29", "s3", "s34", "s38", "s40", "t21", "t22", "t28", "u1",
    "u15", "u23", "u33", "u6", "u7", "v1", "v10", "v13", "v20", "v28",
    "v29", "v30", "v31", "v4", "v6", "v7", "w11", "w14", "w15", "w17",
    "w18", "w19", "w22", "w23", "w24", "w25", "x1", "x7", "x8", "y1",
    "y2", "y3", "y4", "y5", "z1", "z11", "z2", "z3", "z4",
];

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("class index {index} out of range for {count} labels")]
    IndexOutOfRange { index: usize, count: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct LabelTable {
    codes: &'static [&'static str],
}

impl LabelTable {
    pub fn gardiner() -> Self {
        Self {
            codes: &GARDINER_CODES,
        }
    }

    pub fn label_at(&self, index: usize) -> Result<&'static str, LabelError> {
        self.codes
            .get(index)
            .copied()
            .ok_or(LabelError::IndexOutOfRange {
                index,
                count: self.codes.len(),
            })
    }

    pub fn count(&self) -> usize {
        self.codes.len()
    }
}
