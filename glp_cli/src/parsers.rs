use glp_routing::point::Point;
use jiff::SpanRelativeTo;

pub fn parse_duration(input: &str) -> Result<jiff::SignedDuration, String> {
    if let Ok(duration) = input.parse::<jiff::SignedDuration>() {
        return Ok(duration);
    }

    if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        return Ok(duration);
    }

    if let Ok(seconds) = input.parse::<i64>() {
        return Ok(jiff::SignedDuration::from_secs(seconds.abs()));
    }

    Err(String::from("Invalid duration"))
}

/// `x,y`
pub fn parse_point(input: &str) -> Result<Point, String> {
    let Some((x, y)) = input.split_once(',') else {
        return Err(format!("Expected `x,y`, got `{input}`"));
    };

    let x = x.trim().parse::<i32>().map_err(|error| error.to_string())?;
    let y = y.trim().parse::<i32>().map_err(|error| error.to_string())?;
    Ok(Point::new(x, y))
}
