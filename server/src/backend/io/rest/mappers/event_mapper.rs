use crate::backend::domain::commands::advance::UpdateAdvanceCommand;
use crate::backend::domain::commands::events::CreateEventCommand;
use crate::backend::domain::models::event::{AdvanceEntry, AdvanceState, Event as DomainEvent};
use shared::{
    AdvanceHistoryEntry, AdvanceUpdateResponse, CreateEventRequest, Event as SharedEvent,
    UpdateAdvanceRequest,
};

/// Mapper between the event DTOs in `shared` and the domain models
pub struct EventMapper;

impl EventMapper {
    pub fn to_dto(domain: DomainEvent) -> SharedEvent {
        SharedEvent {
            id: domain.id,
            client_name: domain.client_name,
            phones: domain.phones,
            amount: domain.amount,
            amount_money: domain.amount_money,
            advance: domain.advance,
            advance_money: domain.advance_money,
            advance_history: domain
                .advance_history
                .into_iter()
                .map(Self::to_history_dto)
                .collect(),
            comment: domain.comment,
            version: domain.version,
        }
    }

    fn to_history_dto(entry: AdvanceEntry) -> AdvanceHistoryEntry {
        AdvanceHistoryEntry {
            amount: entry.amount,
            change_type: entry.change_type,
            date: entry.date,
        }
    }

    pub fn to_advance_update_dto(state: AdvanceState) -> AdvanceUpdateResponse {
        AdvanceUpdateResponse {
            id: state.event_id,
            advance: state.advance,
            advance_money: state.advance_money,
            version: state.version,
        }
    }

    pub fn to_create_command(request: CreateEventRequest) -> CreateEventCommand {
        CreateEventCommand {
            client_name: request.client_name,
            phones: request.phones,
            amount: request.amount,
            amount_money: request.amount_money,
            comment: request.comment,
        }
    }

    pub fn to_update_command(
        event_id: i64,
        request: UpdateAdvanceRequest,
        idempotency_key: Option<String>,
    ) -> UpdateAdvanceCommand {
        UpdateAdvanceCommand {
            event_id,
            amount: request.amount,
            change_type: request.change_type,
            advance_money: request.advance_money,
            expected_version: request.expected_version,
            idempotency_key,
        }
    }
}
