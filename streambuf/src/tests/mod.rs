mod buffer_notifier;
