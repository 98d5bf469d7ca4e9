use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use tracing::info;

use crate::processing::{ConvertError, Field, Lap, Sample, Session};

const TCD_NAMESPACE: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const NAMESPACES: [(&str, &str); 4] = [
    ("ns2", "http://www.garmin.com/xmlschemas/UserProfile/v2"),
    ("ns3", "http://www.garmin.com/xmlschemas/ActivityExtension/v2"),
    ("ns4", "http://www.garmin.com/xmlschemas/ProfileExtension/v1"),
    ("ns5", "http://www.garmin.com/xmlschemas/ActivityGoals/v1"),
];
const SCHEMA_LOCATION: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2 \
     http://www.garmin.com/xmlschemas/TrainingCenterDatabasev2.xsd";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000Z";
const FILE_NAME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S.tcx";

/// Time zone the X-Trainer clock was running in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputZone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl OutputZone {
    /// Resolve a wall-clock timestamp to UTC.
    ///
    /// With the system zone an ambiguous time resolves to its earlier instant.
    /// Returns `None` for a wall-clock time that never happened.
    pub fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            OutputZone::Local => Local
                .from_local_datetime(&local)
                .earliest()
                .map(|time| time.with_timezone(&Utc)),
            OutputZone::Fixed(offset) => offset
                .from_local_datetime(&local)
                .single()
                .map(|time| time.with_timezone(&Utc)),
        }
    }
}

/// Name of the file a session is written to, from its local start time.
pub fn file_name(session: &Session) -> String {
    session.start_time().format(FILE_NAME_FORMAT).to_string()
}

fn utc_stamp(zone: &OutputZone, local: NaiveDateTime, file: &str) -> Result<String, ConvertError> {
    zone.to_utc(local)
        .map(|time| time.format(TIME_FORMAT).to_string())
        .ok_or_else(|| ConvertError::format(file, format!("local time {local} does not exist")))
}

fn major_minor() -> (&'static str, &'static str) {
    (
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR"),
    )
}

/// Serialize one session as a TrainingCenterDatabase document.
pub fn render_session(session: &Session, zone: &OutputZone) -> Result<String, ConvertError> {
    let file = file_name(session);
    let mut body = String::new();

    body.push_str("<?xml version='1.0' encoding='UTF-8'?>\n");
    body.push_str(&format!("<TrainingCenterDatabase xmlns=\"{TCD_NAMESPACE}\""));
    for (prefix, uri) in NAMESPACES {
        body.push_str(&format!(" xmlns:{prefix}=\"{uri}\""));
    }
    body.push_str(&format!(
        " xmlns:xsi=\"{XSI_NAMESPACE}\" xsi:schemaLocation=\"{SCHEMA_LOCATION}\">\n"
    ));
    body.push_str("  <Activities>\n");
    body.push_str("    <Activity Sport=\"Biking\">\n");
    body.push_str(&format!(
        "      <Id>{}</Id>\n",
        utc_stamp(zone, session.start_time(), &file)?
    ));

    for lap in session.laps() {
        push_lap(&mut body, lap, zone, &file)?;
    }

    push_creator(&mut body);
    body.push_str("    </Activity>\n");
    body.push_str("  </Activities>\n");
    push_author(&mut body);
    body.push_str("</TrainingCenterDatabase>\n");

    Ok(body)
}

fn push_lap(body: &mut String, lap: &Lap, zone: &OutputZone, file: &str) -> Result<(), ConvertError> {
    body.push_str(&format!(
        "      <Lap StartTime=\"{}\">\n",
        utc_stamp(zone, lap.start_time(), file)?
    ));
    body.push_str(&format!(
        "        <TotalTimeSeconds>{:.1}</TotalTimeSeconds>\n",
        lap.total_time_seconds()
    ));
    body.push_str(&format!(
        "        <DistanceMeters>{:.1}</DistanceMeters>\n",
        lap.distance_meters()
    ));
    body.push_str(&format!(
        "        <MaximumSpeed>{:.4}</MaximumSpeed>\n",
        lap.max_speed_mps().unwrap_or_default()
    ));
    body.push_str("        <Calories>0</Calories>\n");

    let average_pulse = lap.average(Field::Pulse).unwrap_or_default();
    if average_pulse > 0.0 {
        body.push_str(&format!(
            "        <AverageHeartRateBpm>\n          <Value>{:.0}</Value>\n        </AverageHeartRateBpm>\n",
            average_pulse
        ));
    }
    let max_pulse = lap.maximum(Field::Pulse).unwrap_or_default();
    if max_pulse > 0.0 {
        body.push_str(&format!(
            "        <MaximumHeartRateBpm>\n          <Value>{:.0}</Value>\n        </MaximumHeartRateBpm>\n",
            max_pulse
        ));
    }

    body.push_str(&format!("        <Intensity>{}</Intensity>\n", lap.intensity()));
    body.push_str(&format!(
        "        <Cadence>{:.0}</Cadence>\n",
        lap.average(Field::Cadence).unwrap_or_default()
    ));
    body.push_str("        <TriggerMethod>Manual</TriggerMethod>\n");

    body.push_str("        <Track>\n");
    for sample in lap.samples() {
        push_trackpoint(body, sample, zone, file)?;
    }
    body.push_str("        </Track>\n");

    body.push_str("        <Extensions>\n");
    body.push_str("          <ns3:LX>\n");
    body.push_str(&format!(
        "            <ns3:AvgSpeed>{:.4}</ns3:AvgSpeed>\n",
        lap.average_speed_mps().unwrap_or_default()
    ));
    body.push_str(&format!(
        "            <ns3:MaxBikeCadence>{:.0}</ns3:MaxBikeCadence>\n",
        lap.maximum(Field::Cadence).unwrap_or_default()
    ));
    body.push_str(&format!(
        "            <ns3:AvgWatts>{:.0}</ns3:AvgWatts>\n",
        lap.average(Field::Power).unwrap_or_default()
    ));
    body.push_str(&format!(
        "            <ns3:MaxWatts>{:.0}</ns3:MaxWatts>\n",
        lap.maximum(Field::Power).unwrap_or_default()
    ));
    body.push_str("          </ns3:LX>\n");
    body.push_str("        </Extensions>\n");
    body.push_str("      </Lap>\n");

    Ok(())
}

fn push_trackpoint(
    body: &mut String,
    sample: &Sample,
    zone: &OutputZone,
    file: &str,
) -> Result<(), ConvertError> {
    body.push_str("          <Trackpoint>\n");
    body.push_str(&format!(
        "            <Time>{}</Time>\n",
        utc_stamp(zone, sample.time, file)?
    ));
    body.push_str(&format!(
        "            <AltitudeMeters>{:.4}</AltitudeMeters>\n",
        sample.altitude
    ));
    body.push_str(&format!(
        "            <DistanceMeters>{:.4}</DistanceMeters>\n",
        sample.distance
    ));
    if sample.pulse != 0 {
        body.push_str(&format!(
            "            <HeartRateBpm>\n              <Value>{}</Value>\n            </HeartRateBpm>\n",
            sample.pulse
        ));
    }
    body.push_str(&format!("            <Cadence>{}</Cadence>\n", sample.cadence));
    body.push_str("            <Extensions>\n");
    body.push_str("              <ns3:TPX>\n");
    body.push_str(&format!(
        "                <ns3:Speed>{:.4}</ns3:Speed>\n",
        sample.speed / 3.6
    ));
    body.push_str(&format!(
        "                <ns3:RunCadence>{}</ns3:RunCadence>\n",
        sample.cadence
    ));
    body.push_str(&format!("                <ns3:Watts>{}</ns3:Watts>\n", sample.power));
    body.push_str("              </ns3:TPX>\n");
    body.push_str("            </Extensions>\n");
    body.push_str("          </Trackpoint>\n");

    Ok(())
}

fn push_creator(body: &mut String) {
    body.push_str("      <Creator xsi:type=\"Device_t\">\n");
    body.push_str("        <Name>X-Trainer Studio</Name>\n");
    body.push_str("        <UnitId>0</UnitId>\n");
    body.push_str("        <ProductID>0</ProductID>\n");
    body.push_str("        <Version>\n");
    body.push_str("          <VersionMajor>1</VersionMajor>\n");
    body.push_str("          <VersionMinor>0</VersionMinor>\n");
    body.push_str("          <BuildMajor>1</BuildMajor>\n");
    body.push_str("          <BuildMinor>0</BuildMinor>\n");
    body.push_str("        </Version>\n");
    body.push_str("      </Creator>\n");
}

fn push_author(body: &mut String) {
    let (major, minor) = major_minor();
    body.push_str("  <Author xsi:type=\"Application_t\">\n");
    body.push_str("    <Name>X-Trainer Convert</Name>\n");
    body.push_str("    <Build>\n");
    body.push_str("      <Version>\n");
    body.push_str(&format!("        <VersionMajor>{major}</VersionMajor>\n"));
    body.push_str(&format!("        <VersionMinor>{minor}</VersionMinor>\n"));
    body.push_str("        <BuildMajor>1</BuildMajor>\n");
    body.push_str("        <BuildMinor>0</BuildMinor>\n");
    body.push_str("      </Version>\n");
    body.push_str("    </Build>\n");
    body.push_str("    <LangID>en</LangID>\n");
    body.push_str("    <PartNumber>XXX-XXXXX-XX</PartNumber>\n");
    body.push_str("  </Author>\n");
}

/// Write an already rendered document into `dir` and return its path.
pub fn write_document(dir: &Path, name: &str, document: &str) -> Result<PathBuf, ConvertError> {
    let path = dir.join(name);
    fs::write(&path, document).map_err(|source| ConvertError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), bytes = document.len(), "wrote TCX file");
    Ok(path)
}

pub fn write_session(session: &Session, dir: &Path, zone: &OutputZone) -> Result<PathBuf, ConvertError> {
    let document = render_session(session, zone)?;
    write_document(dir, &file_name(session), &document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::lap::tests::{at, reading};
    use crate::processing::{Reading, curve::recompute_curves};

    fn plus_one() -> OutputZone {
        OutputZone::Fixed(FixedOffset::east_opt(3600).expect("valid offset"))
    }

    fn session() -> Session {
        let mut ride = Lap::active(at(18, 0, 0));
        ride.extend((0..3).map(|_| reading(201, 0, 36.0)));
        let mut rest = Lap::resting(at(18, 0, 3));
        rest.extend((0..2).map(|_| Reading {
            pulse: 0,
            ..reading(100, 0, 15.0)
        }));
        let mut laps = vec![ride, rest];
        recompute_curves(&mut laps, 10.0);
        Session::new(laps).expect("laps present")
    }

    #[test]
    fn file_name_uses_local_start() {
        assert_eq!(file_name(&session()), "2024-03-10_18:00:00.tcx");
    }

    #[test]
    fn fixed_offset_shifts_to_utc() {
        let utc = plus_one().to_utc(at(18, 0, 0)).expect("representable");
        assert_eq!(utc.format(TIME_FORMAT).to_string(), "2024-03-10T17:00:00.000Z");
    }

    #[test]
    fn document_carries_laps_and_trackpoints() {
        let xml = render_session(&session(), &plus_one()).expect("renders");

        assert!(xml.starts_with("<?xml version='1.0' encoding='UTF-8'?>"));
        assert!(xml.contains("xmlns:ns3=\"http://www.garmin.com/xmlschemas/ActivityExtension/v2\""));
        assert!(xml.contains("<Id>2024-03-10T17:00:00.000Z</Id>"));
        assert_eq!(xml.matches("<Lap StartTime=").count(), 2);
        assert_eq!(xml.matches("<Trackpoint>").count(), 5);
        assert!(xml.contains("<Lap StartTime=\"2024-03-10T17:00:03.000Z\">"));

        assert!(xml.contains("<TotalTimeSeconds>2.0</TotalTimeSeconds>"));
        assert!(xml.contains("<DistanceMeters>30.0</DistanceMeters>"));
        assert!(xml.contains("<MaximumSpeed>10.0000</MaximumSpeed>"));
        assert!(xml.contains("<Intensity>Resting</Intensity>"));
        assert!(xml.contains("<ns3:AvgWatts>201</ns3:AvgWatts>"));
        assert!(xml.contains("<AltitudeMeters>10.0000</AltitudeMeters>"));
        assert!(xml.contains("<DistanceMeters>20.0000</DistanceMeters>"));
        assert!(xml.contains("<ns3:Speed>10.0000</ns3:Speed>"));
    }

    #[test]
    fn heart_rate_is_omitted_when_absent() {
        let xml = render_session(&session(), &plus_one()).expect("renders");
        // Only the active lap and its three trackpoints carry heart rate.
        assert_eq!(xml.matches("<AverageHeartRateBpm>").count(), 1);
        assert_eq!(xml.matches("<HeartRateBpm>").count(), 3);
    }

    #[test]
    fn session_is_written_under_its_start_time() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_session(&session(), dir.path(), &plus_one()).expect("written");

        assert_eq!(path, dir.path().join("2024-03-10_18:00:00.tcx"));
        let written = fs::read_to_string(&path).expect("readable");
        assert!(written.contains("<Name>X-Trainer Convert</Name>"));
    }
}
