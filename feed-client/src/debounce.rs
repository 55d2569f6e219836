use std::time::Duration;

use tokio::sync::mpsc;

/// Задержка поиска по умолчанию.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
/// Debounce по заднему фронту: значение уходит на выход, только когда
/// после него `delay` не было новых значений. Более ранние ожидающие
/// значения отбрасываются, очереди нет.
///
/// Ожидающее значение теряется, если все `Debouncer` удалены до истечения
/// задержки.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Запускает фоновую задачу и возвращает вход и выход debounce.
    ///
    /// Требует запущенного tokio runtime.
    pub fn spawn(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (input, mut input_rx) = mpsc::unbounded_channel::<T>();
        let (output, output_rx) = mpsc::unbounded_channel::<T>();

        tokio::spawn(async move {
            while let Some(mut pending) = input_rx.recv().await {
                loop {
                    match tokio::time::timeout(delay, input_rx.recv()).await {
                        Ok(Some(next)) => pending = next,
                        Ok(None) => return,
                        Err(_elapsed) => {
                            if output.send(pending).is_err() {
                                return;
                            }
                            break;
                        }
                    }
                }
            }
        });

        (Self { input }, output_rx)
    }

    /// Передаёт новое значение. Возвращает `false`, если выход уже закрыт.
    pub fn push(&self, value: T) -> bool {
        self.input.send(value).is_ok()
    }
}
