//! DJI WPML mission packaging.
//!
//! A mission is a KMZ (zip) archive holding `wpmz/template.kml` and
//! `wpmz/waylines.wpml`. Each placemark carries its actions in a
//! `reachPoint` action group; timed photography spans placemarks through a
//! `multipleTiming` group from the start placemark to the stop placemark.

use crate::error::{FlightPlanError, Result};
use crate::models::{Action, HeightMode, Waypath, Waypoint};
use crate::spatial::normalize_heading;
use crate::waypoints::physical_pitch;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const TEMPLATE_ENTRY: &str = "wpmz/template.kml";
pub const WAYLINES_ENTRY: &str = "wpmz/waylines.wpml";

const KML_NS: &str = "http://www.opengis.net/kml/2.2";
const WPML_NS: &str = "http://www.dji.com/wpmz/1.0.2";

/// Consecutive placemarks closer than this (degrees) are merged.
const SAME_POSITION_DEG: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    /// Stop at the placemark before continuing
    Stop,
    /// Fly through without stopping
    PassThrough,
}

impl TurnMode {
    fn wpml_name(self) -> &'static str {
        match self {
            TurnMode::Stop => "toPointAndStopWithDiscontinuityCurvature",
            TurnMode::PassThrough => "toPointAndPassWithContinuityCurvature",
        }
    }

    fn from_wpml(name: &str) -> Result<Self> {
        match name {
            "toPointAndStopWithDiscontinuityCurvature" => Ok(TurnMode::Stop),
            "toPointAndPassWithContinuityCurvature" => Ok(TurnMode::PassThrough),
            other => Err(FlightPlanError::encoding(format!("unknown turn mode {other}"))),
        }
    }
}

/// One mission placemark. `speed` is the speed of the leg leaving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placemark {
    pub index: usize,
    pub lon: f64,
    pub lat: f64,
    pub height: f64,
    pub heading: f64,
    pub gimbal_pitch: f64,
    pub speed: f64,
    pub turn_mode: TurnMode,
    pub actions: Vec<Action>,
}

/// Mission-wide settings written to both documents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionSettings {
    pub height_mode: HeightMode,
    pub auto_flight_speed: f64,
    /// Nominal flight height above ground (m)
    pub global_height: f64,
    pub drone_enum: u32,
    pub drone_sub_enum: u32,
}

impl MissionSettings {
    pub fn new(height_mode: HeightMode, auto_flight_speed: f64, global_height: f64) -> Self {
        Self {
            height_mode,
            auto_flight_speed,
            global_height,
            // DJI Mini 4 Pro
            drone_enum: 68,
            drone_sub_enum: 0,
        }
    }

    fn execute_height_mode(&self) -> &'static str {
        match self.height_mode {
            HeightMode::Absolute => "EGM96",
            HeightMode::RelativeToTakeoff => "relativeToStartPoint",
        }
    }
}

// ========== PLACEMARKS ==========

fn placemark_for(waypoint: &Waypoint, speed: f64, turn_mode: TurnMode) -> Result<Placemark> {
    let height = waypoint.altitude.ok_or_else(|| {
        FlightPlanError::encoding(format!(
            "waypoint {} has no altitude; run terrain integration first",
            waypoint.sequence_index
        ))
    })?;
    Ok(Placemark {
        index: 0,
        lon: waypoint.lon,
        lat: waypoint.lat,
        height,
        heading: waypoint.heading,
        gimbal_pitch: physical_pitch(waypoint.gimbal_angle),
        speed,
        turn_mode,
        actions: waypoint.actions.clone(),
    })
}

fn stop_mode(waypoint: &Waypoint) -> TurnMode {
    if waypoint.speed == 0.0 {
        TurnMode::Stop
    } else {
        TurnMode::PassThrough
    }
}

fn same_position(a: &Placemark, b: &Waypoint) -> bool {
    (a.lon - b.lon).abs() < SAME_POSITION_DEG && (a.lat - b.lat).abs() < SAME_POSITION_DEG
}

/// Flatten a waypath into mission placemarks. In line mode a wayline start
/// that coincides with the previous wayline's end is merged into it, with the
/// end's actions first.
pub fn build_placemarks(path: &Waypath) -> Result<Vec<Placemark>> {
    let mut placemarks: Vec<Placemark> = Vec::new();
    match path {
        Waypath::Points(points) => {
            for waypoint in points {
                placemarks.push(placemark_for(waypoint, waypoint.speed, TurnMode::Stop)?);
            }
        }
        Waypath::Lines(lines) => {
            for line in lines {
                let start = placemark_for(&line.start, line.speed, stop_mode(&line.start))?;
                match placemarks.last_mut() {
                    Some(previous) if same_position(previous, &line.start) => {
                        previous.actions.extend(start.actions);
                        previous.height = start.height;
                        previous.heading = start.heading;
                        previous.gimbal_pitch = start.gimbal_pitch;
                        previous.speed = start.speed;
                        if start.turn_mode == TurnMode::Stop {
                            previous.turn_mode = TurnMode::Stop;
                        }
                    }
                    _ => placemarks.push(start),
                }
                placemarks.push(placemark_for(&line.end, line.speed, stop_mode(&line.end))?);
            }
        }
    }
    if placemarks.is_empty() {
        return Err(FlightPlanError::EmptyPath("no waypoints to encode".into()));
    }
    for (index, placemark) in placemarks.iter_mut().enumerate() {
        placemark.index = index;
    }
    timed_photo_spans(&placemarks)?;
    Ok(placemarks)
}

/// (start index, end index, interval) of every timed photo run.
///
/// Timers may only open as the last action of a placemark and close as the
/// first, so the action order survives the round trip through action groups.
fn timed_photo_spans(placemarks: &[Placemark]) -> Result<Vec<(usize, usize, f64)>> {
    let mut spans = Vec::new();
    let mut open: Option<(usize, f64)> = None;
    for placemark in placemarks {
        let last = placemark.actions.len().saturating_sub(1);
        for (pos, action) in placemark.actions.iter().enumerate() {
            match action {
                Action::StopTimedPhoto => {
                    let Some((start, interval)) = open.take() else {
                        return Err(FlightPlanError::encoding(format!(
                            "placemark {} stops a timer that was never started",
                            placemark.index
                        )));
                    };
                    if pos != 0 {
                        return Err(FlightPlanError::encoding(format!(
                            "placemark {}: timer stop must be the first action",
                            placemark.index
                        )));
                    }
                    spans.push((start, placemark.index, interval));
                }
                Action::StartTimedPhoto { interval_s } => {
                    if open.is_some() || pos != last {
                        return Err(FlightPlanError::encoding(format!(
                            "placemark {}: timer start must be the last action of an idle timer",
                            placemark.index
                        )));
                    }
                    open = Some((placemark.index, *interval_s));
                }
                _ => {}
            }
        }
    }
    if let Some((start, _)) = open {
        return Err(FlightPlanError::encoding(format!(
            "timer started at placemark {start} is never stopped"
        )));
    }
    Ok(spans)
}

// ========== XML WRITING ==========

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Result<Self> {
        let mut out = Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        };
        out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(out)
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|err| FlightPlanError::encoding(format!("xml write failed: {err}")))
    }

    fn open(&mut self, name: &str) -> Result<()> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    fn open_root(&mut self) -> Result<()> {
        let mut start = BytesStart::new("kml");
        start.push_attribute(("xmlns", KML_NS));
        start.push_attribute(("xmlns:wpml", WPML_NS));
        self.event(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn leaf(&mut self, name: &str, value: impl Display) -> Result<()> {
        self.open(name)?;
        self.event(Event::Text(BytesText::new(&value.to_string())))?;
        self.close(name)
    }

    fn finish(self) -> Result<Vec<u8>> {
        Ok(self.writer.into_inner())
    }
}

fn write_mission_config(xml: &mut XmlOut, settings: &MissionSettings) -> Result<()> {
    xml.open("wpml:missionConfig")?;
    xml.leaf("wpml:flyToWaylineMode", "safely")?;
    xml.leaf("wpml:finishAction", "goHome")?;
    xml.leaf("wpml:exitOnRCLost", "executeLostAction")?;
    xml.leaf("wpml:executeRCLostAction", "goBack")?;
    xml.leaf("wpml:globalTransitionalSpeed", settings.auto_flight_speed)?;
    xml.open("wpml:droneInfo")?;
    xml.leaf("wpml:droneEnumValue", settings.drone_enum)?;
    xml.leaf("wpml:droneSubEnumValue", settings.drone_sub_enum)?;
    xml.close("wpml:droneInfo")?;
    xml.close("wpml:missionConfig")
}

fn write_coordinates(xml: &mut XmlOut, placemark: &Placemark) -> Result<()> {
    xml.open("Point")?;
    xml.leaf("coordinates", format!("{},{}", placemark.lon, placemark.lat))?;
    xml.close("Point")
}

/// `template.kml`: the editable mission template.
pub fn template_kml(placemarks: &[Placemark], settings: &MissionSettings) -> Result<Vec<u8>> {
    let now = chrono::Utc::now().timestamp_millis();
    let mut xml = XmlOut::new()?;
    xml.open_root()?;
    xml.open("Document")?;
    xml.leaf("wpml:author", "flightplan")?;
    xml.leaf("wpml:createTime", now)?;
    xml.leaf("wpml:updateTime", now)?;
    write_mission_config(&mut xml, settings)?;

    xml.open("Folder")?;
    xml.leaf("wpml:templateType", "waypoint")?;
    xml.leaf("wpml:templateId", 0)?;
    xml.open("wpml:waylineCoordinateSysParam")?;
    xml.leaf("wpml:coordinateMode", "WGS84")?;
    xml.leaf("wpml:heightMode", settings.execute_height_mode())?;
    xml.close("wpml:waylineCoordinateSysParam")?;
    xml.leaf("wpml:autoFlightSpeed", settings.auto_flight_speed)?;
    xml.leaf("wpml:globalHeight", settings.global_height)?;
    for placemark in placemarks {
        xml.open("Placemark")?;
        write_coordinates(&mut xml, placemark)?;
        xml.leaf("wpml:index", placemark.index)?;
        xml.leaf("wpml:useGlobalHeight", 0)?;
        xml.leaf("wpml:height", placemark.height)?;
        xml.leaf("wpml:ellipsoidHeight", placemark.height)?;
        xml.close("Placemark")?;
    }
    xml.close("Folder")?;
    xml.close("Document")?;
    xml.close("kml")?;
    xml.finish()
}

fn write_action(xml: &mut XmlOut, id: usize, heading: f64, action: &Action) -> Result<()> {
    xml.open("wpml:action")?;
    xml.leaf("wpml:actionId", id)?;
    match action {
        Action::TakePhoto | Action::StartTimedPhoto { .. } => {
            xml.leaf("wpml:actionActuatorFunc", "takePhoto")?;
            xml.open("wpml:actionActuatorFuncParam")?;
            xml.leaf("wpml:payloadPositionIndex", 0)?;
            xml.close("wpml:actionActuatorFuncParam")?;
        }
        Action::GimbalRotate { pitch } => {
            xml.leaf("wpml:actionActuatorFunc", "gimbalRotate")?;
            xml.open("wpml:actionActuatorFuncParam")?;
            xml.leaf("wpml:gimbalRotateMode", "absoluteAngle")?;
            xml.leaf("wpml:gimbalPitchRotateEnable", 1)?;
            xml.leaf("wpml:gimbalPitchRotateAngle", pitch)?;
            xml.leaf("wpml:gimbalRollRotateEnable", 0)?;
            xml.leaf("wpml:gimbalYawRotateEnable", 0)?;
            xml.leaf("wpml:gimbalRotateTimeEnable", 0)?;
            xml.leaf("wpml:payloadPositionIndex", 0)?;
            xml.close("wpml:actionActuatorFuncParam")?;
        }
        Action::Hover { seconds } => {
            xml.leaf("wpml:actionActuatorFunc", "hover")?;
            xml.open("wpml:actionActuatorFuncParam")?;
            xml.leaf("wpml:hoverTime", seconds)?;
            xml.close("wpml:actionActuatorFuncParam")?;
        }
        Action::Turn { heading: target } => {
            let direction = if normalize_heading(target - heading) >= 0.0 {
                "clockwise"
            } else {
                "counterClockwise"
            };
            xml.leaf("wpml:actionActuatorFunc", "rotateYaw")?;
            xml.open("wpml:actionActuatorFuncParam")?;
            xml.leaf("wpml:aircraftHeading", target)?;
            xml.leaf("wpml:aircraftPathMode", direction)?;
            xml.close("wpml:actionActuatorFuncParam")?;
        }
        Action::StopTimedPhoto => {
            return Err(FlightPlanError::encoding(
                "timer stop has no standalone action form",
            ));
        }
    }
    xml.close("wpml:action")
}

/// `waylines.wpml`: the executable mission.
pub fn waylines_wpml(placemarks: &[Placemark], settings: &MissionSettings) -> Result<Vec<u8>> {
    let spans = timed_photo_spans(placemarks)?;
    let mut xml = XmlOut::new()?;
    xml.open_root()?;
    xml.open("Document")?;
    write_mission_config(&mut xml, settings)?;

    xml.open("Folder")?;
    xml.leaf("wpml:templateId", 0)?;
    xml.leaf("wpml:executeHeightMode", settings.execute_height_mode())?;
    xml.leaf("wpml:waylineId", 0)?;
    xml.leaf("wpml:autoFlightSpeed", settings.auto_flight_speed)?;

    let mut group_id = 0usize;
    let mut action_id = 0usize;
    for placemark in placemarks {
        xml.open("Placemark")?;
        write_coordinates(&mut xml, placemark)?;
        xml.leaf("wpml:index", placemark.index)?;
        xml.leaf("wpml:executeHeight", placemark.height)?;
        xml.leaf("wpml:waypointSpeed", placemark.speed)?;
        xml.open("wpml:waypointHeadingParam")?;
        xml.leaf("wpml:waypointHeadingMode", "smoothTransition")?;
        xml.leaf("wpml:waypointHeadingAngle", placemark.heading)?;
        xml.leaf("wpml:waypointHeadingPathMode", "followBadArc")?;
        xml.close("wpml:waypointHeadingParam")?;
        xml.open("wpml:waypointTurnParam")?;
        xml.leaf("wpml:waypointTurnMode", placemark.turn_mode.wpml_name())?;
        xml.leaf("wpml:waypointTurnDampingDist", 0)?;
        xml.close("wpml:waypointTurnParam")?;
        xml.leaf("wpml:useStraightLine", 1)?;
        xml.leaf("wpml:gimbalPitchAngle", placemark.gimbal_pitch)?;

        let point_actions: Vec<&Action> = placemark
            .actions
            .iter()
            .filter(|a| !matches!(a, Action::StartTimedPhoto { .. } | Action::StopTimedPhoto))
            .collect();
        if !point_actions.is_empty() {
            xml.open("wpml:actionGroup")?;
            xml.leaf("wpml:actionGroupId", group_id)?;
            xml.leaf("wpml:actionGroupStartIndex", placemark.index)?;
            xml.leaf("wpml:actionGroupEndIndex", placemark.index)?;
            xml.leaf("wpml:actionGroupMode", "sequence")?;
            xml.open("wpml:actionTrigger")?;
            xml.leaf("wpml:actionTriggerType", "reachPoint")?;
            xml.close("wpml:actionTrigger")?;
            for action in point_actions {
                write_action(&mut xml, action_id, placemark.heading, action)?;
                action_id += 1;
            }
            xml.close("wpml:actionGroup")?;
            group_id += 1;
        }

        for &(start, end, interval) in spans.iter().filter(|span| span.0 == placemark.index) {
            xml.open("wpml:actionGroup")?;
            xml.leaf("wpml:actionGroupId", group_id)?;
            xml.leaf("wpml:actionGroupStartIndex", start)?;
            xml.leaf("wpml:actionGroupEndIndex", end)?;
            xml.leaf("wpml:actionGroupMode", "sequence")?;
            xml.open("wpml:actionTrigger")?;
            xml.leaf("wpml:actionTriggerType", "multipleTiming")?;
            xml.leaf("wpml:actionTriggerParam", interval)?;
            xml.close("wpml:actionTrigger")?;
            write_action(
                &mut xml,
                action_id,
                placemark.heading,
                &Action::StartTimedPhoto { interval_s: interval },
            )?;
            action_id += 1;
            xml.close("wpml:actionGroup")?;
            group_id += 1;
        }
        xml.close("Placemark")?;
    }
    xml.close("Folder")?;
    xml.close("Document")?;
    xml.close("kml")?;
    xml.finish()
}

// ========== ARCHIVE ==========

/// KMZ archive bytes for `path`. Fails before producing anything if a
/// waypoint has no altitude.
pub fn encode_mission(path: &Waypath, settings: &MissionSettings) -> Result<Vec<u8>> {
    let placemarks = build_placemarks(path)?;
    let template = template_kml(&placemarks, settings)?;
    let waylines = waylines_wpml(&placemarks, settings)?;

    let zip_err = |err: zip::result::ZipError| FlightPlanError::encoding(format!("kmz packaging failed: {err}"));
    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in [(TEMPLATE_ENTRY, &template), (WAYLINES_ENTRY, &waylines)] {
        archive.start_file(name, options).map_err(zip_err)?;
        archive
            .write_all(bytes)
            .map_err(|err| FlightPlanError::encoding(format!("kmz packaging failed: {err}")))?;
    }
    let cursor = archive.finish().map_err(zip_err)?;
    tracing::debug!("encoded mission with {} placemarks", placemarks.len());
    Ok(cursor.into_inner())
}

/// Write `bytes` to a sibling temp file, then rename over `outfile`, so an
/// interrupted run never leaves a truncated mission behind.
pub fn write_atomically(outfile: &Path, bytes: &[u8]) -> Result<()> {
    let mut partial = outfile.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let write_err = |err: std::io::Error| {
        FlightPlanError::encoding(format!("cannot write {}: {err}", outfile.display()))
    };
    let written = std::fs::write(&partial, bytes).and_then(|()| std::fs::rename(&partial, outfile));
    if let Err(err) = written {
        let _ = std::fs::remove_file(&partial);
        return Err(write_err(err));
    }
    Ok(())
}

/// Encode and write a KMZ mission to `outfile`.
pub fn write_mission(path: &Waypath, settings: &MissionSettings, outfile: &Path) -> Result<()> {
    let bytes = encode_mission(path, settings)?;
    write_atomically(outfile, &bytes)?;
    tracing::info!("mission written to {}", outfile.display());
    Ok(())
}

// ========== DECODING ==========

#[derive(Debug, Default)]
struct RawAction {
    func: String,
    pitch: Option<f64>,
    hover: Option<f64>,
    heading: Option<f64>,
}

#[derive(Debug, Default)]
struct RawGroup {
    start: usize,
    end: usize,
    trigger: String,
    interval: Option<f64>,
    actions: Vec<RawAction>,
}

#[derive(Debug, Default)]
struct RawPlacemark {
    lon: f64,
    lat: f64,
    index: usize,
    height: f64,
    heading: f64,
    gimbal_pitch: f64,
    speed: f64,
    turn_mode: String,
    groups: Vec<RawGroup>,
}

fn parse_number<T: std::str::FromStr>(field: &str, text: &str) -> Result<T> {
    text.trim()
        .parse::<T>()
        .map_err(|_| FlightPlanError::encoding(format!("invalid {field} value {text:?}")))
}

fn raw_action(raw: &RawAction) -> Result<Option<Action>> {
    let missing = |param: &str| FlightPlanError::encoding(format!("{} action without {param}", raw.func));
    Ok(match raw.func.as_str() {
        "takePhoto" => Some(Action::TakePhoto),
        "gimbalRotate" => Some(Action::GimbalRotate {
            pitch: raw.pitch.ok_or_else(|| missing("gimbalPitchRotateAngle"))?,
        }),
        "hover" => Some(Action::Hover {
            seconds: raw.hover.ok_or_else(|| missing("hoverTime"))?,
        }),
        "rotateYaw" => Some(Action::Turn {
            heading: raw.heading.ok_or_else(|| missing("aircraftHeading"))?,
        }),
        other => {
            tracing::warn!("skipping unsupported action {}", other);
            None
        }
    })
}

fn malformed(err: impl Display) -> FlightPlanError {
    FlightPlanError::encoding(format!("malformed waylines: {err}"))
}

/// Parse placemarks back out of a `waylines.wpml` document.
pub fn decode_waylines(xml: &str) -> Result<Vec<Placemark>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut raws: Vec<RawPlacemark> = Vec::new();
    let mut placemark: Option<RawPlacemark> = None;
    let mut group: Option<RawGroup> = None;
    let mut action: Option<RawAction> = None;
    let mut element = String::new();

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => {
                element = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                match element.as_str() {
                    "Placemark" => placemark = Some(RawPlacemark::default()),
                    "actionGroup" => group = Some(RawGroup::default()),
                    "action" => action = Some(RawAction::default()),
                    _ => {}
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(malformed)?;
                let text = text.as_ref();
                if let Some(action) = action.as_mut() {
                    match element.as_str() {
                        "actionActuatorFunc" => action.func = text.to_string(),
                        "gimbalPitchRotateAngle" => action.pitch = Some(parse_number(&element, text)?),
                        "hoverTime" => action.hover = Some(parse_number(&element, text)?),
                        "aircraftHeading" => action.heading = Some(parse_number(&element, text)?),
                        _ => {}
                    }
                } else if let Some(group) = group.as_mut() {
                    match element.as_str() {
                        "actionGroupStartIndex" => group.start = parse_number(&element, text)?,
                        "actionGroupEndIndex" => group.end = parse_number(&element, text)?,
                        "actionTriggerType" => group.trigger = text.to_string(),
                        "actionTriggerParam" => group.interval = Some(parse_number(&element, text)?),
                        _ => {}
                    }
                } else if let Some(placemark) = placemark.as_mut() {
                    match element.as_str() {
                        "coordinates" => {
                            let mut parts = text.split(',');
                            let (Some(lon), Some(lat)) = (parts.next(), parts.next()) else {
                                return Err(FlightPlanError::encoding(format!(
                                    "invalid coordinates {text:?}"
                                )));
                            };
                            placemark.lon = parse_number("longitude", lon)?;
                            placemark.lat = parse_number("latitude", lat)?;
                        }
                        "index" => placemark.index = parse_number(&element, text)?,
                        "executeHeight" => placemark.height = parse_number(&element, text)?,
                        "waypointSpeed" => placemark.speed = parse_number(&element, text)?,
                        "waypointHeadingAngle" => placemark.heading = parse_number(&element, text)?,
                        "waypointTurnMode" => placemark.turn_mode = text.to_string(),
                        "gimbalPitchAngle" => placemark.gimbal_pitch = parse_number(&element, text)?,
                        _ => {}
                    }
                }
            }
            Event::End(end) => match end.local_name().as_ref() {
                b"action" => {
                    if let (Some(done), Some(group)) = (action.take(), group.as_mut()) {
                        group.actions.push(done);
                    }
                }
                b"actionGroup" => {
                    if let (Some(done), Some(placemark)) = (group.take(), placemark.as_mut()) {
                        placemark.groups.push(done);
                    }
                }
                b"Placemark" => {
                    if let Some(done) = placemark.take() {
                        raws.push(done);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    resolve_placemarks(raws)
}

fn resolve_placemarks(raws: Vec<RawPlacemark>) -> Result<Vec<Placemark>> {
    let mut timed: Vec<(usize, usize, f64)> = Vec::new();
    for raw in &raws {
        for group in raws_timed(raw) {
            let interval = group
                .interval
                .ok_or_else(|| FlightPlanError::encoding("timed group without an interval"))?;
            timed.push((group.start, group.end, interval));
        }
    }

    let mut placemarks = Vec::with_capacity(raws.len());
    for raw in raws {
        let mut actions = Vec::new();
        if timed.iter().any(|&(start, end, _)| end == raw.index && start < raw.index) {
            actions.push(Action::StopTimedPhoto);
        }
        for group in raw.groups.iter().filter(|g| g.trigger == "reachPoint") {
            for action in &group.actions {
                if let Some(action) = raw_action(action)? {
                    actions.push(action);
                }
            }
        }
        if let Some(&(_, _, interval)) = timed.iter().find(|&&(start, _, _)| start == raw.index) {
            actions.push(Action::StartTimedPhoto { interval_s: interval });
        }
        placemarks.push(Placemark {
            index: raw.index,
            lon: raw.lon,
            lat: raw.lat,
            height: raw.height,
            heading: raw.heading,
            gimbal_pitch: raw.gimbal_pitch,
            speed: raw.speed,
            turn_mode: TurnMode::from_wpml(&raw.turn_mode)?,
            actions,
        });
    }
    Ok(placemarks)
}

fn raws_timed(raw: &RawPlacemark) -> impl Iterator<Item = &RawGroup> {
    raw.groups.iter().filter(|g| g.trigger == "multipleTiming")
}

/// Placemarks of a KMZ mission held in memory.
pub fn decode_mission(bytes: &[u8]) -> Result<Vec<Placemark>> {
    let zip_err = |err: zip::result::ZipError| FlightPlanError::encoding(format!("invalid kmz: {err}"));
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_err)?;
    let mut entry = archive.by_name(WAYLINES_ENTRY).map_err(zip_err)?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    decode_waylines(&xml)
}

/// Placemarks of a KMZ mission on disk.
pub fn read_mission(path: &Path) -> Result<Vec<Placemark>> {
    let bytes = std::fs::read(path)?;
    decode_mission(&bytes)
}
