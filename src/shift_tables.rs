//! Configuration shift-line sequences replayed during bring-up.
//!
//! Each sequence clocks 20 pattern bytes into the line. Verified sequences
//! then strobe the line 16 times and compare the collected status bytes
//! against `expect`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShiftSequence {
    pub(crate) pattern: [u8; 20],
    pub(crate) expect: Option<[u8; 16]>,
}

const BLANK: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x01, 0x03, 0x01,
        0x03, 0x01, 0x03, 0x01, 0x03, 0x01, 0x03, 0x01, 0x03, 0x01,
    ],
    expect: None,
};

const COMMON_1: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x05,
        0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x71, 0x79,
        0x71, 0x71, 0x71, 0x71, 0x79, 0x79, 0x79, 0x79,
    ]),
};

const COMMON_2: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x05,
        0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x71, 0x71,
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x79, 0x71,
    ]),
};

const COMMON_3: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x05,
        0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x71, 0x71,
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x79, 0x71,
    ]),
};

const COMMON_4: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x05,
        0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x71, 0x71, 0x79, 0x79, 0x79, 0x71, 0x71, 0x71,
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x71, 0x71,
    ]),
};

const COMMON_5: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x05,
        0x07, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x71, 0x71, 0x79, 0x79, 0x79, 0x71, 0x71, 0x71,
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x71, 0x79,
    ]),
};

const COMMON_6: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x05,
        0x07, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x71, 0x71,
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x71, 0x71,
    ]),
};

const COMMON_7: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x05,
        0x07, 0x05, 0x07, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x71, 0x71,
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x71, 0x71,
    ]),
};

const COMMON_8: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x05,
        0x07, 0x05, 0x07, 0x05, 0x07, 0x05, 0x07, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x71, 0x71, 0x79, 0x79, 0x71, 0x71, 0x79, 0x71,
        0x71, 0x71, 0x79, 0x79, 0x71, 0x79, 0x79, 0x79,
    ]),
};

const LINK_1: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x01,
        0x03, 0x01, 0x03, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x79, 0x71, 0x71, 0x71, 0x71, 0x79, 0x79, 0x71,
        0x71, 0x79, 0x71, 0x79, 0x71, 0x79, 0x79, 0x79,
    ]),
};

const LINK_2: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x01,
        0x03, 0x01, 0x03, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x79, 0x71, 0x79, 0x79, 0x79, 0x71, 0x71, 0x71,
        0x71, 0x79, 0x79, 0x71, 0x79, 0x71, 0x79, 0x79,
    ]),
};

const LINK_3: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x01,
        0x03, 0x01, 0x03, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x79, 0x71, 0x71, 0x71, 0x79, 0x79, 0x79, 0x71,
        0x71, 0x71, 0x71, 0x79, 0x79, 0x79, 0x79, 0x71,
    ]),
};

const LINK_4: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x01,
        0x03, 0x01, 0x03, 0x05, 0x07, 0x05, 0x07, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x79, 0x71, 0x79, 0x79, 0x71, 0x79, 0x79, 0x71,
        0x71, 0x71, 0x71, 0x71, 0x71, 0x79, 0x71, 0x79,
    ]),
};

const INITIAL_1: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x01, 0x03, 0x01, 0x03, 0x01, 0x03, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x79, 0x71, 0x79, 0x71, 0x71, 0x71, 0x71, 0x71,
        0x71, 0x71, 0x79, 0x71, 0x71, 0x79, 0x71, 0x79,
    ]),
};

const INITIAL_2: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x01, 0x03, 0x01, 0x03, 0x01, 0x03, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x79, 0x79, 0x79, 0x79, 0x79, 0x79, 0x79, 0x71,
        0x79, 0x79, 0x79, 0x79, 0x71, 0x71, 0x79, 0x79,
    ]),
};

const INITIAL_3: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x01, 0x03, 0x01, 0x03, 0x05, 0x07, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x79, 0x79, 0x79, 0x79, 0x71, 0x71, 0x71, 0x71,
        0x71, 0x71, 0x79, 0x79, 0x79, 0x79, 0x71, 0x79,
    ]),
};

const INITIAL_4: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x01, 0x03, 0x01, 0x03, 0x05, 0x07, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x79, 0x79, 0x79, 0x71, 0x79, 0x79, 0x79, 0x79,
        0x79, 0x71, 0x71, 0x71, 0x71, 0x71, 0x79, 0x71,
    ]),
};

const INITIAL_5: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x01, 0x03, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x71, 0x79, 0x71, 0x71, 0x71, 0x79, 0x71, 0x79,
        0x79, 0x79, 0x71, 0x71, 0x71, 0x71, 0x71, 0x79,
    ]),
};

const INITIAL_6: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x01, 0x03, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x79, 0x79, 0x79, 0x79, 0x71, 0x71, 0x79, 0x71,
        0x79, 0x71, 0x71, 0x79, 0x71, 0x79, 0x79, 0x79,
    ]),
};

const INITIAL_7: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x01, 0x03, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x79, 0x79, 0x71, 0x79, 0x79, 0x79, 0x71, 0x79,
        0x79, 0x79, 0x71, 0x71, 0x79, 0x79, 0x79, 0x71,
    ]),
};

const INITIAL_8: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x01, 0x03, 0x05, 0x07, 0x05, 0x07, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x79, 0x71, 0x71, 0x71, 0x71, 0x79, 0x71, 0x79,
        0x79, 0x79, 0x79, 0x79, 0x71, 0x79, 0x79, 0x71,
    ]),
};

const INITIAL_9: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x71, 0x71, 0x71, 0x79, 0x79, 0x79, 0x79, 0x71,
        0x71, 0x71, 0x79, 0x71, 0x71, 0x79, 0x71, 0x79,
    ]),
};

const INITIAL_10: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x71, 0x79, 0x79, 0x71, 0x79, 0x79, 0x79, 0x71,
        0x71, 0x71, 0x79, 0x71, 0x79, 0x79, 0x71, 0x79,
    ]),
};

const INITIAL_11: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x71, 0x79, 0x71, 0x71, 0x79, 0x71, 0x79, 0x79,
        0x79, 0x71, 0x79, 0x79, 0x79, 0x71, 0x79, 0x71,
    ]),
};

const INITIAL_12: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x79, 0x79, 0x79, 0x79, 0x79, 0x79, 0x79, 0x71,
        0x71, 0x71, 0x71, 0x71, 0x79, 0x79, 0x79, 0x71,
    ]),
};

const INITIAL_13: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x01,
    ],
    expect: Some([
        0x79, 0x71, 0x79, 0x79, 0x71, 0x79, 0x71, 0x71,
        0x71, 0x79, 0x71, 0x71, 0x79, 0x71, 0x79, 0x79,
    ]),
};

const INITIAL_14: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x71, 0x79, 0x71, 0x79, 0x71, 0x71, 0x79, 0x71,
        0x79, 0x79, 0x79, 0x79, 0x71, 0x79, 0x71, 0x71,
    ]),
};

const INITIAL_15: ShiftSequence = ShiftSequence {
    pattern: [
        0x00, 0x05, 0x07, 0x05, 0x07, 0x01, 0x03, 0x01, 0x03, 0x05,
        0x07, 0x05, 0x07, 0x05, 0x07, 0x05, 0x07, 0x05, 0x07, 0x01,
    ],
    expect: Some([
        0x79, 0x79, 0x79, 0x79, 0x79, 0x79, 0x79, 0x79,
        0x79, 0x79, 0x79, 0x79, 0x79, 0x79, 0x79, 0x79,
    ]),
};

pub(crate) const LINK_GROUP: &[ShiftSequence] = &[
    BLANK,
    COMMON_1,
    COMMON_2,
    COMMON_3,
    COMMON_4,
    COMMON_5,
    COMMON_6,
    COMMON_7,
    COMMON_8,
    LINK_1,
    LINK_2,
    LINK_3,
    LINK_4,
    BLANK,
];

pub(crate) const INITIAL_GROUP: &[ShiftSequence] = &[
    BLANK,
    BLANK,
    COMMON_1,
    BLANK,
    BLANK,
    INITIAL_1,
    INITIAL_2,
    INITIAL_3,
    INITIAL_4,
    INITIAL_5,
    INITIAL_6,
    INITIAL_7,
    INITIAL_8,
    INITIAL_9,
    INITIAL_10,
    INITIAL_11,
    INITIAL_12,
    INITIAL_13,
    INITIAL_14,
    BLANK,
    BLANK,
    INITIAL_15,
    BLANK,
];

pub(crate) const TRIM_GROUP: &[ShiftSequence] = &[
    BLANK,
    COMMON_1,
    COMMON_2,
    COMMON_3,
    COMMON_4,
    COMMON_5,
    COMMON_6,
    COMMON_7,
    COMMON_8,
    BLANK,
];
