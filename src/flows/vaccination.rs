// Vaccination funnel: vaccine -> region -> municipality -> branch -> room
// -> schedule table. Every select after the first offers a "go back" entry;
// the schedule step offers to re-open room selection, which is simply a
// step back since the table step sits right after the room step.

use anyhow::Result;
use chrono::{Duration, Local};

use crate::api::{AppNs, Room};
use crate::flows::{labels, Choice, FlowContext};
use crate::ui::{DaySchedule, Selection};
use crate::wizard::{Outcome, StepData, StepFn, Wizard};

pub fn wizard<'a>() -> Wizard<FlowContext<'a>> {
    let steps: Vec<StepFn<FlowContext<'a>>> = vec![
        select_service as StepFn<FlowContext<'a>>,
        select_region as StepFn<FlowContext<'a>>,
        select_municipality as StepFn<FlowContext<'a>>,
        select_branch as StepFn<FlowContext<'a>>,
        select_room as StepFn<FlowContext<'a>>,
        show_schedule as StepFn<FlowContext<'a>>,
    ];
    Wizard::new(steps)
}

pub fn run(ctx: &mut FlowContext) -> Result<()> {
    wizard().run(ctx)
}

/// The upstream wraps the marketable vaccine name in parentheses, e.g.
/// "COVID-19 (Pfizer)". Show the inner part when it exists, the whole
/// name otherwise.
fn display_name(raw: &str) -> &str {
    if let (Some(open), Some(close)) = (raw.find('('), raw.find(')')) {
        if open + 1 < close {
            return &raw[open + 1..close];
        }
    }
    raw
}

/// Group a count with thousands separators, "1,234,567" style.
fn thousands(n: i64) -> String {
    let digits = n.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if n < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn select_service(ctx: &mut FlowContext, _input: &StepData) -> Result<Outcome> {
    ctx.present.working("Fetching available vaccines...");
    let quantities = ctx.api.available_quantities(AppNs::Def)?;

    // Both API namespaces contribute to one merged list; the quantity map
    // is keyed by lower-cased vaccine name.
    let mut services = Vec::new();
    for app in AppNs::ALL {
        for service in ctx.api.service_types(app)? {
            let name = display_name(&service.name);
            let label = match quantities.get(&name.to_lowercase()) {
                Some(count) => format!("{name} ({})", thousands(*count)),
                None => name.to_string(),
            };
            services.push(Choice {
                label,
                id: service.id,
            });
        }
    }
    ctx.present.done();

    let index = match ctx
        .prompt
        .select("Choose a vaccine", &labels(&services), false)?
    {
        Selection::Choice(i) => i,
        Selection::Back | Selection::Cancelled => return Ok(Outcome::Abort),
    };
    let service = services[index].id.clone();

    ctx.present.working("Fetching regions...");
    let regions: Vec<Choice> = ctx
        .api
        .regions(&service, true, AppNs::Def)?
        .into_iter()
        .map(|r| Choice {
            label: r.geo_name,
            id: r.id,
        })
        .collect();
    ctx.present.done();

    Ok(Outcome::Forward(
        StepData::new()
            .set("service", &service)?
            .set("regions", &regions)?,
    ))
}

fn select_region(ctx: &mut FlowContext, input: &StepData) -> Result<Outcome> {
    let service: String = input.get("service")?;
    let regions: Vec<Choice> = input.get("regions")?;

    let index = match ctx
        .prompt
        .select("Region for the appointment", &labels(&regions), true)?
    {
        Selection::Choice(i) => i,
        Selection::Back => return Ok(Outcome::Back),
        Selection::Cancelled => return Ok(Outcome::Abort),
    };
    let region = regions[index].id.clone();

    ctx.present.working("Fetching municipalities...");
    let municipalities: Vec<Choice> = ctx
        .api
        .municipalities(&region, &service, true, AppNs::Def)?
        .into_iter()
        .map(|m| Choice {
            label: m.geo_name,
            id: m.id,
        })
        .collect();
    ctx.present.done();

    Ok(Outcome::Forward(
        StepData::new()
            .set("service", &service)?
            .set("region", &region)?
            .set("municipalities", &municipalities)?,
    ))
}

fn select_municipality(ctx: &mut FlowContext, input: &StepData) -> Result<Outcome> {
    let service: String = input.get("service")?;
    let region: String = input.get("region")?;
    let municipalities: Vec<Choice> = input.get("municipalities")?;

    let index = match ctx.prompt.select(
        "Municipality for the appointment",
        &labels(&municipalities),
        true,
    )? {
        Selection::Choice(i) => i,
        Selection::Back => return Ok(Outcome::Back),
        Selection::Cancelled => return Ok(Outcome::Abort),
    };
    let municipality = municipalities[index].id.clone();

    ctx.present.working("Fetching branches...");
    let branches: Vec<Choice> = ctx
        .api
        .branches(&service, &municipality, true, AppNs::Def)?
        .into_iter()
        .map(|b| Choice {
            label: b.name,
            id: b.id,
        })
        .collect();
    ctx.present.done();

    Ok(Outcome::Forward(
        StepData::new()
            .set("service", &service)?
            .set("region", &region)?
            .set("branches", &branches)?,
    ))
}

fn select_branch(ctx: &mut FlowContext, input: &StepData) -> Result<Outcome> {
    let service: String = input.get("service")?;
    let region: String = input.get("region")?;
    let branches: Vec<Choice> = input.get("branches")?;

    let index = match ctx
        .prompt
        .select("Facility providing the service", &labels(&branches), true)?
    {
        Selection::Choice(i) => i,
        Selection::Back => return Ok(Outcome::Back),
        Selection::Cancelled => return Ok(Outcome::Abort),
    };
    let branch = branches[index].id.clone();

    // The upstream only answers for a one-week window.
    let start = Local::now().date_naive();
    let end = start + Duration::days(7);

    ctx.present.working("Fetching free rooms...");
    let rooms = ctx
        .api
        .slots(&branch, &region, &service, start, end, AppNs::Def)?;
    ctx.present.done();

    Ok(Outcome::Forward(StepData::new().set("rooms", &rooms)?))
}

fn select_room(ctx: &mut FlowContext, input: &StepData) -> Result<Outcome> {
    let rooms: Vec<Room> = input.get("rooms")?;
    let room_labels: Vec<String> = rooms.iter().map(|r| r.name.clone()).collect();

    let index = match ctx.prompt.select("Choose a room", &room_labels, true)? {
        Selection::Choice(i) => i,
        Selection::Back => return Ok(Outcome::Back),
        Selection::Cancelled => return Ok(Outcome::Abort),
    };

    let days: Vec<DaySchedule> = rooms[index]
        .schedules
        .first()
        .map(|schedule| {
            schedule
                .dates
                .iter()
                .map(|date| DaySchedule {
                    date_name: date.date_name.clone(),
                    week_name: date.week_name.clone(),
                    slots: date.slots.iter().map(|s| s.value.clone()).collect(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Outcome::Forward(StepData::new().set("dates", &days)?))
}

fn show_schedule(ctx: &mut FlowContext, input: &StepData) -> Result<Outcome> {
    let days: Vec<DaySchedule> = input.get("dates")?;
    ctx.present.schedule_table(&days);

    // "Yes" steps back into room selection, the step right before this one.
    if ctx.prompt.confirm("View another room?", false)? {
        Ok(Outcome::Back)
    } else {
        Ok(Outcome::Forward(StepData::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CatalogClient, Config};
    use crate::ui::script::{RecordingPresenter, Rendered, ScriptedPrompter};
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> CatalogClient {
        CatalogClient::new(&Config {
            booking_base: server.base_url(),
            token_endpoint: format!("{}/api/numbers", server.base_url()),
            lotto_base: server.base_url(),
            token_batch: 100,
        })
        .unwrap()
    }

    fn mock_tokens(server: &MockServer) {
        let batch: Vec<String> = (0..100).map(|i| format!("sec-{i}")).collect();
        server.mock(|when, then| {
            when.method(GET).path("/api/numbers");
            then.status(200).json_body(json!(batch));
        });
    }

    #[test]
    fn thousands_groups_digits() {
        assert_eq!(thousands(5), "5");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn display_name_prefers_the_parenthesized_part() {
        assert_eq!(display_name("COVID-19 (Pfizer)"), "Pfizer");
        assert_eq!(display_name("A"), "A");
        assert_eq!(display_name("weird ()"), "weird ()");
    }

    #[test]
    fn service_labels_merge_quantity_counts() {
        // Service "A" with quantity {"a": 5} must render as "A (5)".
        let server = MockServer::start();
        mock_tokens(&server);
        server.mock(|when, then| {
            when.method(GET)
                .path("/def/API/api/Public/GetAvailableQuantities");
            then.status(200).json_body(json!("{\"a\":5}"));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/abc/API/api/CommonData/GetServicesTypes");
            then.status(200).json_body(json!([]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/def/API/api/CommonData/GetServicesTypes");
            then.status(200).json_body(json!([{"id": "id1", "name": "A"}]));
        });
        server.mock(|when, then| {
            when.method(GET).path("/def/API/api/CommonData/GetRegions");
            then.status(200).json_body(json!([]));
        });

        let mut api = client_for(&server);
        let mut prompt = ScriptedPrompter::new().selecting([Selection::Choice(0)]);
        let mut present = RecordingPresenter::new();
        let mut ctx = FlowContext {
            api: &mut api,
            prompt: &mut prompt,
            present: &mut present,
        };

        let outcome = select_service(&mut ctx, &StepData::new()).unwrap();
        assert_eq!(prompt.seen_labels[0], vec!["A (5)".to_string()]);
        match outcome {
            Outcome::Forward(data) => {
                assert_eq!(data.get::<String>("service").unwrap(), "id1");
                assert!(data.get::<Vec<Choice>>("regions").unwrap().is_empty());
            }
            other => panic!("expected Forward, got {other:?}"),
        }
    }

    #[test]
    fn full_funnel_with_room_reselect() {
        let server = MockServer::start();
        mock_tokens(&server);
        server.mock(|when, then| {
            when.method(GET)
                .path("/def/API/api/Public/GetAvailableQuantities");
            then.status(200).json_body(json!("{\"pfizer\":120}"));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/abc/API/api/CommonData/GetServicesTypes");
            then.status(200).json_body(json!([]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/def/API/api/CommonData/GetServicesTypes");
            then.status(200)
                .json_body(json!([{"id": "s1", "name": "COVID-19 (Pfizer)"}]));
        });
        server.mock(|when, then| {
            when.method(GET).path("/def/API/api/CommonData/GetRegions");
            then.status(200)
                .json_body(json!([{"id": "r1", "geoName": "Tbilisi"}]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/def/API/api/CommonData/GetMunicipalities/r1");
            then.status(200)
                .json_body(json!([{"id": "m1", "geoName": "Old Tbilisi"}]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/def/API/api/CommonData/GetMunicipalityBranches/s1/m1");
            then.status(200)
                .json_body(json!([{"id": "b1", "name": "Central Clinic"}]));
        });
        server.mock(|when, then| {
            when.method(POST).path("/def/API/api/PublicBooking/GetSlots");
            then.status(200).json_body(json!([
                {"name": "Room 1", "schedules": [{"dates": [{
                    "dateName": "2021-08-02",
                    "weekName": "Monday",
                    "slots": [{"value": "10:00"}],
                }]}]},
                {"name": "Room 2", "schedules": [{"dates": [{
                    "dateName": "2021-08-03",
                    "weekName": "Tuesday",
                    "slots": [{"value": "11:00"}],
                }]}]},
            ]));
        });

        let mut api = client_for(&server);
        let mut prompt = ScriptedPrompter::new()
            .selecting([
                Selection::Choice(0), // vaccine
                Selection::Choice(0), // region
                Selection::Choice(0), // municipality
                Selection::Choice(0), // branch
                Selection::Choice(0), // Room 1
                Selection::Choice(1), // Room 2, after "view another room?"
            ])
            .confirming([true, false]);
        let mut present = RecordingPresenter::new();
        let mut ctx = FlowContext {
            api: &mut api,
            prompt: &mut prompt,
            present: &mut present,
        };

        run(&mut ctx).unwrap();

        // Two tables rendered: Room 1 first, then Room 2 after stepping
        // back into room selection.
        let tables: Vec<&Vec<DaySchedule>> = present
            .events
            .iter()
            .filter_map(|e| match e {
                Rendered::Table(days) => Some(days),
                _ => None,
            })
            .collect();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0][0].week_name, "Monday");
        assert_eq!(tables[1][0].week_name, "Tuesday");
    }

    #[test]
    fn back_from_region_returns_to_service_selection() {
        let server = MockServer::start();
        mock_tokens(&server);
        server.mock(|when, then| {
            when.method(GET)
                .path("/def/API/api/Public/GetAvailableQuantities");
            then.status(200).json_body(json!("{\"a\":5}"));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/abc/API/api/CommonData/GetServicesTypes");
            then.status(200).json_body(json!([]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/def/API/api/CommonData/GetServicesTypes");
            then.status(200).json_body(json!([{"id": "id1", "name": "A"}]));
        });
        server.mock(|when, then| {
            when.method(GET).path("/def/API/api/CommonData/GetRegions");
            then.status(200)
                .json_body(json!([{"id": "r1", "geoName": "Tbilisi"}]));
        });

        let mut api = client_for(&server);
        // Pick the vaccine, back out of the region select, then cancel the
        // re-shown vaccine select: the run ends cleanly.
        let mut prompt = ScriptedPrompter::new().selecting([
            Selection::Choice(0),
            Selection::Back,
            Selection::Cancelled,
        ]);
        let mut present = RecordingPresenter::new();
        let mut ctx = FlowContext {
            api: &mut api,
            prompt: &mut prompt,
            present: &mut present,
        };

        run(&mut ctx).unwrap();
        assert_eq!(prompt.seen_labels.len(), 3);
        // The re-shown first step rebuilt the same vaccine list.
        assert_eq!(prompt.seen_labels[2], prompt.seen_labels[0]);
    }
}
