// Booking lookup: personal number, booking number, then either a summary
// of the reservation or the server's own explanation of the miss.

use anyhow::Result;

use crate::flows::{FlowContext, BOOKING_NUMBER_LEN, PERSONAL_NUMBER_LEN};
use crate::wizard::{Outcome, StepData, StepFn, Wizard};

pub fn wizard<'a>() -> Wizard<FlowContext<'a>> {
    let steps: Vec<StepFn<FlowContext<'a>>> =
        vec![
            ask_personal_number as StepFn<FlowContext<'a>>,
            ask_booking_number as StepFn<FlowContext<'a>>,
            show_booking as StepFn<FlowContext<'a>>,
        ];
    Wizard::new(steps)
}

pub fn run(ctx: &mut FlowContext) -> Result<()> {
    wizard().run(ctx)
}

fn ask_personal_number(ctx: &mut FlowContext, _input: &StepData) -> Result<Outcome> {
    let number = match ctx.prompt.digits(
        "Enter your personal number",
        PERSONAL_NUMBER_LEN,
        "The personal number must be 11 digits",
    )? {
        Some(number) => number,
        None => return Ok(Outcome::Abort),
    };
    Ok(Outcome::Forward(
        StepData::new().set("personal_number", &number)?,
    ))
}

fn ask_booking_number(ctx: &mut FlowContext, input: &StepData) -> Result<Outcome> {
    let personal_number: String = input.get("personal_number")?;
    let number = match ctx.prompt.digits(
        "Enter your booking number",
        BOOKING_NUMBER_LEN,
        "The booking number must be 6 digits",
    )? {
        Some(number) => number,
        None => return Ok(Outcome::Abort),
    };
    Ok(Outcome::Forward(
        StepData::new()
            .set("personal_number", &personal_number)?
            .set("booking_number", &number)?,
    ))
}

fn show_booking(ctx: &mut FlowContext, input: &StepData) -> Result<Outcome> {
    let personal_number: String = input.get("personal_number")?;
    let booking_number: String = input.get("booking_number")?;

    ctx.present.working("Looking up the booking...");
    let result = ctx.api.search_booking(&personal_number, &booking_number)?;
    ctx.present.done();

    match result.value {
        Some(booking) => ctx.present.booking_summary(&booking),
        // No table on a miss, only the server's own message.
        None => ctx.present.notice(result.message.as_deref().unwrap_or("")),
    }

    Ok(Outcome::Forward(StepData::new()))
}
