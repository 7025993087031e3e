use crate::workout::{Workout, WorkoutType};
use anyhow::Result;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

/// Marker popup text: icon and label.
pub fn popup_text(w: &Workout) -> String {
    format!("{} {}", w.workout_type().icon(), w.label())
}

/// Sidebar entry. The derived metric is shown to one decimal; stored values
/// are never rounded.
pub fn list_entry(w: &Workout) -> String {
    let metric = w.metric();
    let (variant, variant_unit) = w.variant_value();
    let variant_icon = match w.workout_type() {
        WorkoutType::Running => "🦶🏼",
        WorkoutType::Cycling => "⛰",
    };

    format!(
        "{title}  [{id}]\n  {icon} {distance} km  ⏱ {duration} min  ⚡️ {metric:.1} {metric_unit}  {variant_icon} {variant} {variant_unit}",
        title = w.label(),
        id = w.id(),
        icon = w.workout_type().icon(),
        distance = w.distance_km(),
        duration = w.duration_min(),
        metric = metric.value(),
        metric_unit = metric.unit(),
    )
}

/// Sidebar order: each new entry goes on top.
pub fn newest_first(workouts: &[Workout]) -> impl Iterator<Item = &Workout> {
    workouts.iter().rev()
}

/// One line per workout, tab separated, for scripting.
pub fn detail_row(w: &Workout) -> String {
    let c = w.coords();
    let (variant, _) = w.variant_value();
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        w.id(),
        w.created_at().to_rfc3339(),
        w.workout_type(),
        c.lat,
        c.lng,
        w.distance_km(),
        w.duration_min(),
        variant,
        w.metric().value(),
    )
}

/// Writes every workout as a GPX 1.1 waypoint, so the markers can be opened
/// in any map viewer.
pub fn write_gpx_waypoints<W: Write>(out: W, workouts: &[Workout]) -> Result<()> {
    let mut xml = Writer::new_with_indent(out, b' ', 2);

    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut gpx = BytesStart::new("gpx");
    gpx.push_attribute(("version", "1.1"));
    gpx.push_attribute(("creator", "waymark"));
    gpx.push_attribute(("xmlns", "http://www.topografix.com/GPX/1/1"));
    xml.write_event(Event::Start(gpx))?;

    for w in workouts {
        let c = w.coords();
        let lat = c.lat.to_string();
        let lon = c.lng.to_string();

        let mut wpt = BytesStart::new("wpt");
        wpt.push_attribute(("lat", lat.as_str()));
        wpt.push_attribute(("lon", lon.as_str()));
        xml.write_event(Event::Start(wpt))?;

        write_text_element(&mut xml, "time", &w.created_at().to_rfc3339())?;
        write_text_element(&mut xml, "name", &w.label())?;
        write_text_element(&mut xml, "desc", &popup_text(w))?;
        write_text_element(&mut xml, "type", w.workout_type().as_str())?;

        xml.write_event(Event::End(BytesEnd::new("wpt")))?;
    }

    xml.write_event(Event::End(BytesEnd::new("gpx")))?;
    Ok(())
}

fn write_text_element<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    xml.write_event(Event::Start(BytesStart::new(name)))?;
    xml.write_event(Event::Text(BytesText::new(text)))?;
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
