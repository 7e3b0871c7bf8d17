//! Wrapped host functions
//!
//! Each entry declares the host's native signature parameter by parameter.
//! The declared kinds decide marshaling, so the order and widths here must
//! match the host API exactly. Every function returns a C `char`.

use crate::adapter::{CallDescriptor, Capacity, ParamKind, ParamSpec};
use crate::ffi::buffer::DecodeMode;
use crate::ffi::types::NativeType;

const TAKE: &str = "MediaItem_Take*";
const TRACK: &str = "MediaTrack*";
const PROJECT: &str = "ReaProject*";

const fn take() -> ParamSpec {
    ParamSpec::new("take", ParamKind::Handle(TAKE))
}

const fn int(name: &'static str) -> ParamSpec {
    ParamSpec::new(name, ParamKind::Scalar(NativeType::Int))
}

const fn byte(name: &'static str) -> ParamSpec {
    ParamSpec::new(name, ParamKind::Scalar(NativeType::Byte))
}

const fn double(name: &'static str) -> ParamSpec {
    ParamSpec::new(name, ParamKind::Scalar(NativeType::Double))
}

const fn opt(name: &'static str, ty: NativeType) -> ParamSpec {
    ParamSpec::new(name, ParamKind::OptionalScalar(ty))
}

const fn input(name: &'static str, capacity: Capacity, optional: bool) -> ParamSpec {
    ParamSpec::new(name, ParamKind::InputString { capacity, optional })
}

const fn output(name: &'static str, capacity: Capacity, mode: DecodeMode) -> ParamSpec {
    ParamSpec::new(name, ParamKind::OutputString { capacity, mode })
}

const fn size(name: &'static str) -> ParamSpec {
    ParamSpec::new(name, ParamKind::BufferSize)
}

const MIDI_GET_EVT_PARAMS: &[ParamSpec] = &[
    take(),
    int("evtidx"),
    opt("selectedOut", NativeType::Byte),
    opt("mutedOut", NativeType::Byte),
    opt("ppqposOut", NativeType::Double),
    output("msg", Capacity::Default, DecodeMode::Trimmed),
    size("msg_sz"),
];

const MIDI_GET_ALL_EVTS_PARAMS: &[ParamSpec] = &[
    take(),
    output("bufNeedBig", Capacity::FromParam(2), DecodeMode::Raw),
    size("bufNeedBig_sz"),
];

const MIDI_GET_HASH_PARAMS: &[ParamSpec] = &[
    take(),
    byte("notesonly"),
    output("hash", Capacity::Default, DecodeMode::Trimmed),
    int("hash_sz"),
];

const MIDI_GET_TEXT_SYSEX_EVT_PARAMS: &[ParamSpec] = &[
    take(),
    int("textsyxevtidx"),
    opt("selectedOut", NativeType::Byte),
    opt("mutedOut", NativeType::Byte),
    opt("ppqposOut", NativeType::Double),
    opt("typeOut", NativeType::Int),
    output("msg", Capacity::FromParam(7), DecodeMode::Trimmed),
    size("msg_sz"),
];

const MIDI_GET_TRACK_HASH_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("track", ParamKind::Handle(TRACK)),
    byte("notesonly"),
    output("hash", Capacity::Default, DecodeMode::Trimmed),
    int("hash_sz"),
];

const MIDI_INSERT_EVT_PARAMS: &[ParamSpec] = &[
    take(),
    byte("selected"),
    byte("muted"),
    double("ppqpos"),
    input("bytestr", Capacity::Default, false),
    int("bytestr_sz"),
];

const MIDI_INSERT_TEXT_SYSEX_EVT_PARAMS: &[ParamSpec] = &[
    take(),
    byte("selected"),
    byte("muted"),
    double("ppqpos"),
    int("type"),
    input("bytestr", Capacity::Default, false),
    int("bytestr_sz"),
];

const MIDI_SET_ALL_EVTS_PARAMS: &[ParamSpec] = &[
    take(),
    input("buf", Capacity::FromParam(2), false),
    int("buf_sz"),
];

const MIDI_SET_CC_PARAMS: &[ParamSpec] = &[
    take(),
    int("ccidx"),
    opt("selectedIn", NativeType::Byte),
    opt("mutedIn", NativeType::Byte),
    opt("ppqposIn", NativeType::Double),
    opt("chanmsgIn", NativeType::Int),
    opt("chanIn", NativeType::Int),
    opt("msg2In", NativeType::Int),
    opt("msg3In", NativeType::Int),
    opt("noSortIn", NativeType::Byte),
];

const MIDI_SET_CC_SHAPE_PARAMS: &[ParamSpec] = &[
    take(),
    int("ccidx"),
    int("shape"),
    double("beztension"),
    opt("noSortIn", NativeType::Byte),
];

const MIDI_SET_EVT_PARAMS: &[ParamSpec] = &[
    take(),
    int("evtidx"),
    opt("selectedIn", NativeType::Byte),
    opt("mutedIn", NativeType::Byte),
    opt("ppqposIn", NativeType::Double),
    input("msg", Capacity::Default, true),
    ParamSpec::new("msg_sz", ParamKind::ScalarOrZero(NativeType::Int)),
    opt("noSortIn", NativeType::Byte),
];

const MIDI_SET_NOTE_PARAMS: &[ParamSpec] = &[
    take(),
    int("noteidx"),
    opt("selectedIn", NativeType::Byte),
    opt("mutedIn", NativeType::Byte),
    opt("startppqposIn", NativeType::Double),
    opt("endppqposIn", NativeType::Double),
    opt("chanIn", NativeType::Int),
    opt("pitchIn", NativeType::Int),
    opt("velIn", NativeType::Int),
    opt("noSortIn", NativeType::Byte),
];

const MIDI_SET_TEXT_SYSEX_EVT_PARAMS: &[ParamSpec] = &[
    take(),
    int("textsyxevtidx"),
    opt("selectedIn", NativeType::Byte),
    opt("mutedIn", NativeType::Byte),
    opt("ppqposIn", NativeType::Double),
    opt("typeIn", NativeType::Int),
    input("msg", Capacity::FromParam(7), true),
    ParamSpec::new("msg_sz", ParamKind::ScalarOrZero(NativeType::Int)),
    opt("noSortIn", NativeType::Byte),
];

const VALIDATE_PTR2_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("proj", ParamKind::Handle(PROJECT)),
    ParamSpec::new("pointer", ParamKind::Scalar(NativeType::U64)),
    input("ctypename", Capacity::Default, false),
];

/// Every catalogue entry returns the host's `bool` as a byte
const fn host_call(name: &'static str, params: &'static [ParamSpec]) -> CallDescriptor {
    CallDescriptor::new(name, params, NativeType::Byte)
}

pub const MIDI_GET_EVT: CallDescriptor = host_call("MIDI_GetEvt", MIDI_GET_EVT_PARAMS);
pub const MIDI_GET_ALL_EVTS: CallDescriptor =
    host_call("MIDI_GetAllEvts", MIDI_GET_ALL_EVTS_PARAMS);
pub const MIDI_GET_HASH: CallDescriptor = host_call("MIDI_GetHash", MIDI_GET_HASH_PARAMS);
pub const MIDI_GET_TEXT_SYSEX_EVT: CallDescriptor =
    host_call("MIDI_GetTextSysexEvt", MIDI_GET_TEXT_SYSEX_EVT_PARAMS);
pub const MIDI_GET_TRACK_HASH: CallDescriptor =
    host_call("MIDI_GetTrackHash", MIDI_GET_TRACK_HASH_PARAMS);
pub const MIDI_INSERT_EVT: CallDescriptor = host_call("MIDI_InsertEvt", MIDI_INSERT_EVT_PARAMS);
pub const MIDI_INSERT_TEXT_SYSEX_EVT: CallDescriptor =
    host_call("MIDI_InsertTextSysexEvt", MIDI_INSERT_TEXT_SYSEX_EVT_PARAMS);
pub const MIDI_SET_ALL_EVTS: CallDescriptor =
    host_call("MIDI_SetAllEvts", MIDI_SET_ALL_EVTS_PARAMS);
pub const MIDI_SET_CC: CallDescriptor = host_call("MIDI_SetCC", MIDI_SET_CC_PARAMS);
pub const MIDI_SET_CC_SHAPE: CallDescriptor =
    host_call("MIDI_SetCCShape", MIDI_SET_CC_SHAPE_PARAMS);
pub const MIDI_SET_EVT: CallDescriptor = host_call("MIDI_SetEvt", MIDI_SET_EVT_PARAMS);
pub const MIDI_SET_NOTE: CallDescriptor = host_call("MIDI_SetNote", MIDI_SET_NOTE_PARAMS);
pub const MIDI_SET_TEXT_SYSEX_EVT: CallDescriptor =
    host_call("MIDI_SetTextSysexEvt", MIDI_SET_TEXT_SYSEX_EVT_PARAMS);
/// Host-bound: the host only validates pointers on its own thread
pub const VALIDATE_PTR2: CallDescriptor =
    host_call("ValidatePtr2", VALIDATE_PTR2_PARAMS).host_bound();

/// Every wrapped function
pub static CATALOGUE: &[CallDescriptor] = &[
    MIDI_GET_EVT,
    MIDI_GET_ALL_EVTS,
    MIDI_GET_HASH,
    MIDI_GET_TEXT_SYSEX_EVT,
    MIDI_GET_TRACK_HASH,
    MIDI_INSERT_EVT,
    MIDI_INSERT_TEXT_SYSEX_EVT,
    MIDI_SET_ALL_EVTS,
    MIDI_SET_CC,
    MIDI_SET_CC_SHAPE,
    MIDI_SET_EVT,
    MIDI_SET_NOTE,
    MIDI_SET_TEXT_SYSEX_EVT,
    VALIDATE_PTR2,
];

/// Look up a descriptor by exact host name
pub fn descriptor(name: &str) -> Option<&'static CallDescriptor> {
    CATALOGUE.iter().find(|d| d.name == name)
}

/// Host names of every wrapped function, in catalogue order
///
/// Handy as the name list for building a function table.
pub fn names() -> impl Iterator<Item = &'static str> {
    CATALOGUE.iter().map(|d| d.name)
}
