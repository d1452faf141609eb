#[cfg(test)]
mod tests {
    use crate::{
        parse_fragments, Activity, ConversationState, Fragment, Message, MessageId, Rating,
    };

    #[test]
    fn test_conversation_state_round_trip_through_json() {
        let mut bot = Message::bot("**Ano**", Some(MessageId::Number(5)));
        bot.rating = Some(Rating::Positive);
        let state = ConversationState {
            messages: vec![Message::user("Je to tak?"), bot],
            activity: Activity::Idle,
            error: None,
            welcome_shown: true,
            is_open: true,
        };

        let json = serde_json::to_string(&state).unwrap();
        let restored: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
        assert!(json.contains("\"rating\":1"));
    }

    #[test]
    fn test_rating_applies_to_bot_reply() {
        let mut state = ConversationState {
            messages: vec![Message::bot("odpověď", Some(MessageId::Number(9)))],
            ..Default::default()
        };

        let msg = state.find_message_mut(&MessageId::Number(9)).unwrap();
        let next = Rating::toggled(msg.current_rating(), Rating::Negative);
        msg.rating = Some(next);

        assert_eq!(state.messages[0].rating, Some(Rating::Negative));
    }

    #[test]
    fn test_fragments_of_bot_reply() {
        let msg = Message::bot("Zkratka **TOI** znamená čas na ledě.", None);
        let fragments = parse_fragments(&msg.content);
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[1], Fragment::Bold("TOI".to_string()));
    }
}
